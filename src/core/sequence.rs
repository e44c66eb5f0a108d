//! Sequence generator for human-readable references (QCP00001, QC00001, ...)

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;

use crate::core::error::{QualityError, QualityResult};
use crate::core::identity::EntityPrefix;
use crate::core::project::{write_atomic, Project};

/// Zero-padded width of the numeric part
const PADDING: usize = 5;

/// Per-prefix counters persisted in `.qct/sequences.yaml`
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Sequences {
    #[serde(default)]
    counters: BTreeMap<String, u32>,
}

impl Sequences {
    pub fn load(project: &Project) -> QualityResult<Self> {
        let path = project.sequences_path();
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = fs::read_to_string(&path)?;
        serde_yml::from_str(&content).map_err(|e| QualityError::Parse {
            path: path.display().to_string(),
            message: e.to_string(),
        })
    }

    pub fn save(&self, project: &Project) -> QualityResult<()> {
        let content = serde_yml::to_string(self).map_err(|e| QualityError::Parse {
            path: project.sequences_path().display().to_string(),
            message: e.to_string(),
        })?;
        write_atomic(&project.sequences_path(), &content)?;
        Ok(())
    }

    /// Take the next reference for a record type
    pub fn next(&mut self, prefix: EntityPrefix) -> String {
        let counter = self.counters.entry(prefix.as_str().to_string()).or_insert(0);
        *counter += 1;
        format!("{}{:0width$}", prefix.as_str(), counter, width = PADDING)
    }

    /// Last number handed out for a record type
    pub fn current(&self, prefix: EntityPrefix) -> u32 {
        self.counters.get(prefix.as_str()).copied().unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_sequences_are_per_prefix() {
        let mut seq = Sequences::default();
        assert_eq!(seq.next(EntityPrefix::Qc), "QC00001");
        assert_eq!(seq.next(EntityPrefix::Qc), "QC00002");
        assert_eq!(seq.next(EntityPrefix::Qa), "QA00001");
        assert_eq!(seq.next(EntityPrefix::Qcp), "QCP00001");
        assert_eq!(seq.current(EntityPrefix::Qc), 2);
    }

    #[test]
    fn test_sequences_persist() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();

        let mut seq = Sequences::load(&project).unwrap();
        seq.next(EntityPrefix::Qa);
        seq.next(EntityPrefix::Qa);
        seq.save(&project).unwrap();

        let mut reloaded = Sequences::load(&project).unwrap();
        assert_eq!(reloaded.next(EntityPrefix::Qa), "QA00003");
    }
}

//! Short ID system for easier record selection
//!
//! Every list command numbers the records it printed (`@1`, `@2`, ...) so
//! the next command can refer to them without typing a ULID. Each record
//! type keeps its own numbering, so listing alerts does not invalidate the
//! aliases of a check list.

use std::collections::BTreeMap;
use std::fs;

use crate::core::identity::{EntityId, EntityPrefix};
use crate::core::project::{write_atomic, Project};

/// Index file location within a project
const INDEX_FILE: &str = ".qct/shortids.json";

/// Short aliases from the last listing of each record type
#[derive(Debug, Default, serde::Serialize, serde::Deserialize)]
pub struct ShortIdIndex {
    /// Prefix -> full IDs in listing order (alias N is position N-1)
    #[serde(default)]
    lists: BTreeMap<String, Vec<String>>,
}

impl ShortIdIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load the index from a project, or start empty
    pub fn load(project: &Project) -> Self {
        let path = project.root().join(INDEX_FILE);
        fs::read_to_string(&path)
            .ok()
            .and_then(|content| serde_json::from_str(&content).ok())
            .unwrap_or_default()
    }

    pub fn save(&self, project: &Project) -> std::io::Result<()> {
        let content = serde_json::to_string_pretty(self)?;
        write_atomic(&project.root().join(INDEX_FILE), &content)
    }

    /// Replace the aliases of one record type
    pub fn rebuild(&mut self, prefix: EntityPrefix, ids: impl IntoIterator<Item = String>) {
        self.lists.insert(prefix.as_str().to_string(), ids.into_iter().collect());
    }

    /// Resolve a short alias for a record type
    ///
    /// Accepts `@N`, a plain number `N`, or the qualified form `QC@N`.
    /// Anything else is passed through unchanged for the store to resolve.
    /// Returns `None` when an alias does not exist.
    pub fn resolve(&self, prefix: EntityPrefix, reference: &str) -> Option<String> {
        let number = match reference.split_once('@') {
            Some((qualifier, n)) => {
                if !qualifier.is_empty() && !qualifier.eq_ignore_ascii_case(prefix.as_str()) {
                    return None;
                }
                n
            }
            None if !reference.is_empty() && reference.chars().all(|c| c.is_ascii_digit()) => reference,
            None => return Some(reference.to_string()),
        };

        let n = number.parse::<usize>().ok().filter(|n| *n > 0)?;
        self.lists
            .get(prefix.as_str())
            .and_then(|ids| ids.get(n - 1))
            .cloned()
    }

    /// Alias number of a record, if it was in the last listing
    pub fn get_short_id(&self, id: &EntityId) -> Option<u32> {
        let full = id.to_string();
        self.lists
            .get(id.prefix().as_str())
            .and_then(|ids| ids.iter().position(|i| *i == full))
            .map(|pos| pos as u32 + 1)
    }

    /// Number of aliases held for a record type
    pub fn len(&self, prefix: EntityPrefix) -> usize {
        self.lists.get(prefix.as_str()).map_or(0, Vec::len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn ids(prefix: EntityPrefix, n: usize) -> Vec<EntityId> {
        (0..n).map(|_| EntityId::new(prefix)).collect()
    }

    #[test]
    fn test_resolve_forms() {
        let checks = ids(EntityPrefix::Qc, 3);
        let mut index = ShortIdIndex::new();
        index.rebuild(EntityPrefix::Qc, checks.iter().map(|i| i.to_string()));

        let second = Some(checks[1].to_string());
        assert_eq!(index.resolve(EntityPrefix::Qc, "@2"), second);
        assert_eq!(index.resolve(EntityPrefix::Qc, "2"), second);
        assert_eq!(index.resolve(EntityPrefix::Qc, "QC@2"), second);
        assert_eq!(index.resolve(EntityPrefix::Qc, "qc@2"), second);
        assert_eq!(index.resolve(EntityPrefix::Qc, "@9"), None);
        assert_eq!(index.resolve(EntityPrefix::Qc, "@0"), None);
        assert_eq!(index.resolve(EntityPrefix::Qc, "QA@2"), None);
    }

    #[test]
    fn test_passthrough() {
        let index = ShortIdIndex::new();
        assert_eq!(
            index.resolve(EntityPrefix::Qc, "QC00012"),
            Some("QC00012".to_string())
        );
    }

    #[test]
    fn test_lists_are_per_prefix() {
        let checks = ids(EntityPrefix::Qc, 2);
        let alerts = ids(EntityPrefix::Qa, 1);
        let mut index = ShortIdIndex::new();
        index.rebuild(EntityPrefix::Qc, checks.iter().map(|i| i.to_string()));
        index.rebuild(EntityPrefix::Qa, alerts.iter().map(|i| i.to_string()));

        assert_eq!(index.len(EntityPrefix::Qc), 2);
        assert_eq!(index.resolve(EntityPrefix::Qa, "@1"), Some(alerts[0].to_string()));
        assert_eq!(index.resolve(EntityPrefix::Qc, "@1"), Some(checks[0].to_string()));
        assert_eq!(index.get_short_id(&checks[1]), Some(2));
        assert_eq!(index.get_short_id(&alerts[0]), Some(1));
    }

    #[test]
    fn test_save_and_load() {
        let tmp = tempdir().unwrap();
        let project = Project::init(tmp.path()).unwrap();
        let points = ids(EntityPrefix::Qcp, 2);

        let mut index = ShortIdIndex::new();
        index.rebuild(EntityPrefix::Qcp, points.iter().map(|i| i.to_string()));
        index.save(&project).unwrap();

        let loaded = ShortIdIndex::load(&project);
        assert_eq!(loaded.resolve(EntityPrefix::Qcp, "@2"), Some(points[1].to_string()));
    }
}

//! Alert stages - the ordered kanban pipeline alerts move through

use serde::{Deserialize, Serialize};

use crate::core::error::{QualityError, QualityResult};

/// One step of the alert pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AlertStage {
    /// Stable key stored on alerts (e.g. "confirmed")
    pub key: String,

    /// Display name
    pub name: String,

    /// Ordering within the pipeline
    pub sequence: u32,

    /// Alerts in this stage are closed
    #[serde(default)]
    pub done: bool,

    /// Collapsed in kanban-style listings
    #[serde(default)]
    pub folded: bool,
}

impl AlertStage {
    pub fn new(key: &str, name: &str, sequence: u32, done: bool) -> Self {
        Self {
            key: key.to_string(),
            name: name.to_string(),
            sequence,
            done,
            folded: done,
        }
    }
}

/// Ordered list of alert stages, as stored in `.qct/stages.yaml`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StagePipeline {
    pub stages: Vec<AlertStage>,
}

impl Default for StagePipeline {
    fn default() -> Self {
        Self {
            stages: vec![
                AlertStage::new("new", "New", 1, false),
                AlertStage::new("confirmed", "Confirmed", 2, false),
                AlertStage::new("action_proposed", "Action Proposed", 3, false),
                AlertStage::new("solved", "Solved", 4, true),
            ],
        }
    }
}

impl StagePipeline {
    /// Build a pipeline, sorting by sequence and checking its shape
    pub fn new(mut stages: Vec<AlertStage>) -> QualityResult<Self> {
        stages.sort_by_key(|s| s.sequence);
        let pipeline = Self { stages };
        pipeline.validate()?;
        Ok(pipeline)
    }

    /// A pipeline needs unique keys, an open stage and a closing stage
    pub fn validate(&self) -> QualityResult<()> {
        for (i, stage) in self.stages.iter().enumerate() {
            if stage.key.trim().is_empty() {
                return Err(QualityError::validation("stage key cannot be empty"));
            }
            if self.stages[..i].iter().any(|s| s.key == stage.key) {
                return Err(QualityError::validation(format!(
                    "duplicate stage key '{}'",
                    stage.key
                )));
            }
        }
        if !self.stages.iter().any(|s| !s.done) {
            return Err(QualityError::validation(
                "the alert pipeline needs at least one open stage",
            ));
        }
        if !self.stages.iter().any(|s| s.done) {
            return Err(QualityError::validation(
                "the alert pipeline needs at least one done stage",
            ));
        }
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&AlertStage> {
        self.stages.iter().find(|s| s.key == key)
    }

    /// Look up a stage by key or (case-insensitive) name
    pub fn resolve(&self, key_or_name: &str) -> QualityResult<&AlertStage> {
        self.stages
            .iter()
            .find(|s| s.key == key_or_name || s.name.eq_ignore_ascii_case(key_or_name))
            .ok_or_else(|| QualityError::UnknownStage(key_or_name.to_string()))
    }

    /// Stage new alerts start in
    pub fn first_open(&self) -> &AlertStage {
        self.stages
            .iter()
            .filter(|s| !s.done)
            .min_by_key(|s| s.sequence)
            .unwrap_or(&self.stages[0])
    }

    /// First stage that closes an alert
    pub fn first_done(&self) -> Option<&AlertStage> {
        self.stages
            .iter()
            .filter(|s| s.done)
            .min_by_key(|s| s.sequence)
    }

    /// First done stage with a sequence at or after `sequence`
    pub fn done_after(&self, sequence: u32) -> Option<&AlertStage> {
        self.stages
            .iter()
            .filter(|s| s.done && s.sequence >= sequence)
            .min_by_key(|s| s.sequence)
    }

    /// The stage following `key` in sequence order
    pub fn next(&self, key: &str) -> Option<&AlertStage> {
        let current = self.get(key)?;
        self.stages
            .iter()
            .filter(|s| s.sequence > current.sequence)
            .min_by_key(|s| s.sequence)
    }

    pub fn is_done(&self, key: &str) -> bool {
        self.get(key).is_some_and(|s| s.done)
    }
}

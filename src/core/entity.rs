//! Entity trait - common interface for all quality records

use chrono::{DateTime, Utc};
use serde::{de::DeserializeOwned, Serialize};

use crate::core::identity::{EntityId, EntityPrefix};

/// Common trait for all QCT records
pub trait Entity: Serialize + DeserializeOwned {
    /// The record type prefix
    const PREFIX: EntityPrefix;

    /// Get the record's unique ID
    fn id(&self) -> &EntityId;

    /// Get the human-readable sequence reference (e.g. "QC00042")
    fn reference(&self) -> &str;

    /// Get the record's title
    fn title(&self) -> &str;

    /// Get the creation timestamp
    fn created(&self) -> DateTime<Utc>;

    /// Get the author
    fn author(&self) -> &str;
}

/// Priority values for alerts
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "lowercase")]
#[derive(Default)]
pub enum Priority {
    #[default]
    Normal,
    Low,
    High,
    Urgent,
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Normal => write!(f, "normal"),
            Priority::Low => write!(f, "low"),
            Priority::High => write!(f, "high"),
            Priority::Urgent => write!(f, "urgent"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "normal" | "0" => Ok(Priority::Normal),
            "low" | "1" => Ok(Priority::Low),
            "high" | "2" => Ok(Priority::High),
            "urgent" | "3" => Ok(Priority::Urgent),
            _ => Err(format!(
                "Unknown priority: {}. Use normal, low, high, or urgent",
                s
            )),
        }
    }
}

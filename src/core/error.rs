//! Domain errors for quality operations

use thiserror::Error;

use crate::core::identity::IdParseError;
use crate::entities::check::QualityState;
use crate::yaml::RecordSyntaxError;

/// Errors raised by quality operations
///
/// Every operation validates before it writes, so any of these aborts the
/// action with nothing persisted.
#[derive(Debug, Error)]
pub enum QualityError {
    #[error("No {kind} found matching '{reference}'")]
    NotFound { kind: &'static str, reference: String },

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Check {check} is in state '{state}'; only failed checks can raise an alert")]
    AlertRequiresFailure { check: String, state: QualityState },

    #[error("Check {check} is already in state '{state}'")]
    AlreadyInState { check: String, state: QualityState },

    #[error("Cannot move alert {alert} backward from stage '{from}' to '{to}' (reopen it first)")]
    BackwardStage {
        alert: String,
        from: String,
        to: String,
    },

    #[error("Unknown alert stage '{0}'")]
    UnknownStage(String),

    #[error("Quality point {point} is referenced by {count} check(s); archive it instead")]
    Referenced { point: String, count: usize },

    #[error("Permission denied: {0} requires an administrator")]
    AdminRequired(&'static str),

    #[error(transparent)]
    InvalidId(#[from] IdParseError),

    #[error("Failed to parse {path}: {message}")]
    Parse { path: String, message: String },

    /// A record file with a YAML error, keeping its source location
    #[error("Failed to parse {path}: {source}")]
    Syntax {
        path: String,
        source: Box<RecordSyntaxError>,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl QualityError {
    pub fn validation(message: impl Into<String>) -> Self {
        QualityError::Validation(message.into())
    }
}

/// Result alias for quality operations
pub type QualityResult<T> = std::result::Result<T, QualityError>;

//! Record type definitions
//!
//! QCT tracks three kinds of records plus the stage pipeline:
//!
//! - [`QualityPoint`] - what to inspect, on which product and operation, and how often
//! - [`QualityCheck`] - one inspection with its pass/fail decision
//! - [`QualityAlert`] - an escalation worked through the [`StagePipeline`]

pub mod alert;
pub mod check;
pub mod point;
pub mod stage;

pub use alert::QualityAlert;
pub use check::{QualityCheck, QualityState};
pub use point::{CheckKind, Frequency, QualityPoint, TestType};
pub use stage::{AlertStage, StagePipeline};

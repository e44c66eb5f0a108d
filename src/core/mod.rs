//! Core module - fundamental types, persistence and quality operations

pub mod action;
pub mod config;
pub mod context;
pub mod entity;
pub mod error;
pub mod identity;
pub mod loader;
pub mod project;
pub mod sequence;
pub mod service;
pub mod shortid;
pub mod stats;
pub mod store;

pub use action::Action;
pub use config::Config;
pub use context::Context;
pub use entity::{Entity, Priority};
pub use error::{QualityError, QualityResult};
pub use identity::{EntityId, EntityPrefix, IdParseError};
pub use project::{Project, ProjectError};
pub use service::{NewCheck, Operation, OperationLine, PlannedCheck, QualityService};
pub use shortid::ShortIdIndex;
pub use store::QualityStore;

//! CLI command implementations

pub mod alert;
pub mod check;
pub mod completions;
pub mod import;
pub mod init;
pub mod point;
pub mod report;
pub mod run;
pub mod stage;
pub mod stats;
pub mod validate;

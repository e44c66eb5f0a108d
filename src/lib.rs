//! QCT: Quality Control Toolkit
//!
//! Quality points, checks and alerts kept as plain YAML files next to the
//! rest of a project, with a Unix-style command line on top.

pub mod cli;
pub mod core;
pub mod entities;
pub mod telemetry;
pub mod yaml;

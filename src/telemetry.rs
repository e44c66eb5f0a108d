//! Logging setup
//!
//! Log lines go to stderr so they never mix with command output on stdout.

use thiserror::Error;
use tracing_subscriber::filter::ParseError;
use tracing_subscriber::EnvFilter;

/// Project-specific filter variable, checked before `RUST_LOG`
pub const LOG_ENV: &str = "QCT_LOG";

#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("invalid log filter '{value}'")]
    EnvFilter {
        value: String,
        #[source]
        source: ParseError,
    },

    #[error("telemetry error: {0}")]
    Subscriber(Box<dyn std::error::Error + Send + Sync>),
}

/// Default filter for a verbosity flag
pub fn default_level(verbose: bool) -> &'static str {
    if verbose {
        "debug"
    } else {
        "warn"
    }
}

/// Build the filter: `QCT_LOG`, then `RUST_LOG`, then the default level
pub fn build_filter(verbose: bool) -> Result<EnvFilter, TelemetryError> {
    let value = std::env::var(LOG_ENV)
        .or_else(|_| std::env::var(EnvFilter::DEFAULT_ENV))
        .unwrap_or_else(|_| default_level(verbose).to_string());

    EnvFilter::try_new(&value).map_err(|source| TelemetryError::EnvFilter { value, source })
}

/// Install the global subscriber
pub fn init(verbose: bool) -> Result<(), TelemetryError> {
    tracing_subscriber::fmt()
        .with_env_filter(build_filter(verbose)?)
        .with_writer(std::io::stderr)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(TelemetryError::Subscriber)
}

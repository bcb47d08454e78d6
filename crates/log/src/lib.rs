//! keyrot logging
//!
//! Installs a `tracing` subscriber with an env-style filter and one of three
//! output formats.
//!
//! ```rust,no_run
//! let _guard = keyrot_log::init()?;
//! tracing::info!(profile = "default", "rotating");
//! # Ok::<(), keyrot_log::LogError>(())
//! ```

#![forbid(unsafe_code)]

mod builder;
mod config;

pub use builder::{LoggerBuilder, LoggerGuard};
pub use config::{Config, DisplayConfig, Format};

/// Logging setup errors
#[derive(Debug, thiserror::Error)]
pub enum LogError {
    /// The filter directive does not parse
    #[error("invalid log filter {0}")]
    Filter(String),

    /// Unrecognised format name
    #[error("unknown log format '{0}' (expected compact, pretty or json)")]
    UnknownFormat(String),

    /// A global subscriber is already installed
    #[error("failed to install logger: {0}")]
    Init(String),
}

/// Result type for logging setup
pub type LogResult<T> = Result<T, LogError>;

/// Initialize from the environment
///
/// # Errors
///
/// See [`LoggerBuilder::build`].
pub fn init() -> LogResult<LoggerGuard> {
    init_with(Config::from_env())
}

/// Initialize with an explicit configuration
///
/// # Errors
///
/// See [`LoggerBuilder::build`].
pub fn init_with(config: Config) -> LogResult<LoggerGuard> {
    LoggerBuilder::from_config(config).build()
}

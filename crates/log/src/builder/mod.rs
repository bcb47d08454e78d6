//! Logger builder implementation
//!
//! Events go to stderr so stdout stays free for command output.

use tracing_subscriber::fmt;
use tracing_subscriber::{EnvFilter, Registry, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::{Config, Format};
use crate::{LogError, LogResult};

/// Logger builder
#[derive(Debug)]
pub struct LoggerBuilder {
    config: Config,
}

/// Describes the subscriber that was installed
///
/// The subscriber is global and stays installed whether or not the guard is
/// kept around.
#[derive(Debug)]
pub struct LoggerGuard {
    format: Format,
    filter: String,
}

impl LoggerGuard {
    /// Format the installed subscriber writes
    pub fn format(&self) -> Format {
        self.format
    }

    /// Filter directive in effect
    pub fn filter(&self) -> &str {
        &self.filter
    }
}

/// Apply the display options shared by every text format
macro_rules! text_layer {
    ($layer:expr, $display:expr) => {
        $layer
            .with_writer(std::io::stderr)
            .with_ansi($display.colors)
            .with_target($display.target)
            .with_file($display.source)
            .with_line_number($display.source)
    };
}

impl LoggerBuilder {
    /// Create builder from config
    #[must_use]
    pub fn from_config(config: Config) -> Self {
        Self { config }
    }

    /// Parse the filter directive
    ///
    /// # Errors
    ///
    /// Returns [`LogError::Filter`] for an invalid directive.
    pub fn filter(&self) -> LogResult<EnvFilter> {
        EnvFilter::try_new(&self.config.level)
            .map_err(|e| LogError::Filter(format!("{}: {e}", self.config.level)))
    }

    /// Build and install the global subscriber
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - Filter string cannot be parsed
    /// - A global subscriber is already installed
    pub fn build(self) -> LogResult<LoggerGuard> {
        let filter = self.filter()?;
        let display = &self.config.display;
        let registry = Registry::default().with(filter);

        let installed = match self.config.format {
            Format::Compact => registry
                .with(text_layer!(fmt::layer().compact(), display))
                .try_init(),
            Format::Pretty => registry
                .with(text_layer!(fmt::layer().pretty(), display))
                .try_init(),
            Format::Json => registry
                .with(
                    fmt::layer()
                        .json()
                        .with_writer(std::io::stderr)
                        .with_target(display.target)
                        .with_file(display.source)
                        .with_line_number(display.source)
                        .flatten_event(display.flatten)
                        .with_current_span(true)
                        .with_span_list(false),
                )
                .try_init(),
        };
        installed.map_err(|e| LogError::Init(e.to_string()))?;

        Ok(LoggerGuard {
            format: self.config.format,
            filter: self.config.level,
        })
    }
}

//! Logging Bootstrap
//!
//! Configures the `tracing-subscriber` stack for host shells. The core
//! crates only ever emit through `tracing`; hosts that already install their
//! own subscriber can skip this entirely.
//!
//! ## Usage
//!
//! ```ignore
//! use core_api::logging::{init_logging, LogFormat, LoggingConfig};
//!
//! init_logging(LoggingConfig::default().with_format(LogFormat::Compact))?;
//! tracing::info!("console shell started");
//! ```
//!
//! The `RUST_LOG` environment variable overrides the configured default
//! directive when present.

use thiserror::Error;
use tracing_subscriber::filter::EnvFilter;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    /// Human-readable pretty format with colors
    Pretty,
    /// Structured JSON format for machine parsing
    Json,
    /// Compact format for production
    Compact,
}

impl Default for LogFormat {
    fn default() -> Self {
        #[cfg(debug_assertions)]
        return Self::Pretty;

        #[cfg(not(debug_assertions))]
        return Self::Json;
    }
}

/// Logging configuration.
#[derive(Debug, Clone)]
pub struct LoggingConfig {
    pub format: LogFormat,
    /// Filter directive applied when `RUST_LOG` is not set.
    pub default_directive: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::default(),
            default_directive: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    pub fn with_format(mut self, format: LogFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_directive(mut self, directive: impl Into<String>) -> Self {
        self.default_directive = directive.into();
        self
    }
}

/// Failure to install the global subscriber (usually: one is already set).
#[derive(Debug, Error)]
#[error("Failed to initialize logging: {0}")]
pub struct LoggingInitError(String);

/// Install the global tracing subscriber described by `config`.
pub fn init_logging(config: LoggingConfig) -> std::result::Result<(), LoggingInitError> {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(config.default_directive.clone()));

    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    let result = match config.format {
        LogFormat::Pretty => builder.pretty().try_init(),
        LogFormat::Json => builder.json().try_init(),
        LogFormat::Compact => builder.compact().try_init(),
    };

    result.map_err(|e| LoggingInitError(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_builder() {
        let config = LoggingConfig::default()
            .with_format(LogFormat::Json)
            .with_directive("core_api=debug");

        assert_eq!(config.format, LogFormat::Json);
        assert_eq!(config.default_directive, "core_api=debug");
    }

    #[test]
    fn test_init_logging_installs_subscriber() {
        // First install in this process succeeds; this is the only test in
        // the crate that installs one.
        let result = init_logging(LoggingConfig::default().with_format(LogFormat::Compact));
        assert!(result.is_ok());
    }
}

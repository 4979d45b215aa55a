//! Logging configuration
//!
//! Controls how the relay binary installs its `tracing` subscriber.

use serde::Deserialize;
use tracing_subscriber::EnvFilter;

use super::ConfigError;

/// Log level
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Trace level - per-message events
    Trace,
    /// Debug level - connection and subscription events
    Debug,
    /// Info level - normal operation (default)
    #[default]
    Info,
    /// Warn level - warnings only
    Warn,
    /// Error level - errors only
    Error,
}

impl LogLevel {
    /// Convert to tracing level filter string
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Debug => "debug",
            Self::Info => "info",
            Self::Warn => "warn",
            Self::Error => "error",
        }
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    /// Human-readable console output (default)
    #[default]
    Console,
    /// JSON structured logging
    Json,
}

/// Logging configuration
///
/// # Example
///
/// ```toml
/// [log]
/// level = "info"
/// format = "console"
/// ```
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct LogConfig {
    /// Log level (trace, debug, info, warn, error)
    pub level: LogLevel,

    /// Output format (console, json)
    pub format: LogFormat,
}

impl LogConfig {
    /// Filter used when `RUST_LOG` is not set
    pub fn env_filter(&self) -> EnvFilter {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(self.level.as_str()))
    }

    /// Install the global subscriber
    ///
    /// `RUST_LOG` takes precedence over `level`.
    pub fn init(&self) -> Result<(), ConfigError> {
        let builder = tracing_subscriber::fmt().with_env_filter(self.env_filter());

        let result = match self.format {
            LogFormat::Console => builder.try_init(),
            LogFormat::Json => builder.json().try_init(),
        };

        result.map_err(|e| ConfigError::Logging(e.to_string()))
    }
}

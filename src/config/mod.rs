//! Relay configuration file
//!
//! Everything is optional; a missing section or field takes the same default
//! as the corresponding builder config.
//!
//! ```toml
//! [server]
//! bind = "0.0.0.0:1883"
//! max_connections = 0
//! idle_timeout_secs = 300
//! max_line_length = 65536
//! tcp_nodelay = true
//! stats_interval_secs = 60
//!
//! [registry]
//! queue_capacity = 64
//! drain_timeout_ms = 1000
//!
//! [relay]
//! catchup_on_subscribe = true
//! lenient_decode = true
//! publisher_ttl_secs = 300
//! cleanup_interval_secs = 30
//!
//! [log]
//! level = "info"
//! format = "console"
//! ```

pub mod logging;

use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::registry::RegistryConfig;
use crate::relay::RelayConfig;
use crate::server::ServerConfig;

pub use logging::{LogConfig, LogFormat, LogLevel};

/// Configuration loading failures
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File could not be read
    #[error("failed to read '{}': {source}", path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// File is not valid TOML for this schema
    #[error("failed to parse '{}': {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    /// A value parsed but is unusable
    #[error("invalid value for {field}: {reason}")]
    Invalid {
        field: &'static str,
        reason: &'static str,
    },

    /// Global subscriber could not be installed
    #[error("failed to initialise logging: {0}")]
    Logging(String),
}

/// `[server]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ServerSection {
    pub bind: SocketAddr,
    pub max_connections: usize,
    pub idle_timeout_secs: u64,
    pub max_line_length: usize,
    pub tcp_nodelay: bool,
    pub stats_interval_secs: u64,
}

impl Default for ServerSection {
    fn default() -> Self {
        let defaults = ServerConfig::default();
        Self {
            bind: defaults.bind_addr,
            max_connections: defaults.max_connections,
            idle_timeout_secs: defaults.idle_timeout.as_secs(),
            max_line_length: defaults.max_line_length,
            tcp_nodelay: defaults.tcp_nodelay,
            stats_interval_secs: defaults.stats_interval.as_secs(),
        }
    }
}

/// `[registry]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RegistrySection {
    pub queue_capacity: usize,
    pub drain_timeout_ms: u64,
}

impl Default for RegistrySection {
    fn default() -> Self {
        let defaults = RegistryConfig::default();
        Self {
            queue_capacity: defaults.queue_capacity,
            drain_timeout_ms: defaults.drain_timeout.as_millis() as u64,
        }
    }
}

/// `[relay]` section
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RelaySection {
    pub catchup_on_subscribe: bool,
    pub lenient_decode: bool,
    pub publisher_ttl_secs: u64,
    pub cleanup_interval_secs: u64,
}

impl Default for RelaySection {
    fn default() -> Self {
        let defaults = RelayConfig::default();
        Self {
            catchup_on_subscribe: defaults.catchup_on_subscribe,
            lenient_decode: defaults.lenient_decode,
            publisher_ttl_secs: defaults.publisher_ttl.as_secs(),
            cleanup_interval_secs: defaults.cleanup_interval.as_secs(),
        }
    }
}

/// Complete configuration file
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct Config {
    pub server: ServerSection,
    pub registry: RegistrySection,
    pub relay: RelaySection,
    pub log: LogConfig,
}

impl Config {
    /// Read and validate a TOML file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Reject values the runtime cannot work with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.max_line_length == 0 {
            return Err(ConfigError::Invalid {
                field: "server.max_line_length",
                reason: "must be greater than zero",
            });
        }
        if self.server.stats_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "server.stats_interval_secs",
                reason: "must be greater than zero",
            });
        }
        if self.registry.queue_capacity == 0 {
            return Err(ConfigError::Invalid {
                field: "registry.queue_capacity",
                reason: "must be greater than zero",
            });
        }
        if self.relay.cleanup_interval_secs == 0 {
            return Err(ConfigError::Invalid {
                field: "relay.cleanup_interval_secs",
                reason: "must be greater than zero",
            });
        }
        Ok(())
    }

    /// Runtime server settings
    pub fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::with_addr(self.server.bind)
            .max_connections(self.server.max_connections)
            .idle_timeout(Duration::from_secs(self.server.idle_timeout_secs))
            .max_line_length(self.server.max_line_length)
            .stats_interval(Duration::from_secs(self.server.stats_interval_secs));
        config.tcp_nodelay = self.server.tcp_nodelay;
        config
    }

    /// Runtime subscriber queue settings
    pub fn registry_config(&self) -> RegistryConfig {
        RegistryConfig::default()
            .queue_capacity(self.registry.queue_capacity)
            .drain_timeout(Duration::from_millis(self.registry.drain_timeout_ms))
    }

    /// Runtime relay settings, including the registry
    pub fn relay_config(&self) -> RelayConfig {
        RelayConfig::default()
            .registry(self.registry_config())
            .catchup_on_subscribe(self.relay.catchup_on_subscribe)
            .lenient_decode(self.relay.lenient_decode)
            .publisher_ttl(Duration::from_secs(self.relay.publisher_ttl_secs))
            .cleanup_interval(Duration::from_secs(self.relay.cleanup_interval_secs))
    }
}

//! Client configuration

use std::time::Duration;

use crate::protocol::DEFAULT_MAX_LINE_LENGTH;

/// Default relay address for clients
pub const DEFAULT_RELAY_ADDR: &str = "127.0.0.1:1883";

/// Client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay address (`host:port`)
    pub addr: String,

    /// TCP connect timeout
    pub connect_timeout: Duration,

    /// How long to wait for `+OK`/`-ERR`/`PONG`
    pub reply_timeout: Duration,

    /// Maximum accepted line length in bytes
    pub max_line_length: usize,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self::new(DEFAULT_RELAY_ADDR)
    }
}

impl ClientConfig {
    /// Create a config for the given relay address
    pub fn new(addr: impl Into<String>) -> Self {
        Self {
            addr: addr.into(),
            connect_timeout: Duration::from_secs(10),
            reply_timeout: Duration::from_secs(5),
            max_line_length: DEFAULT_MAX_LINE_LENGTH,
        }
    }

    /// Set the connect timeout
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Set the reply timeout
    pub fn reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

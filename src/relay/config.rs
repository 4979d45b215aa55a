//! Relay configuration

use std::time::Duration;

use crate::registry::RegistryConfig;

/// Relay configuration options
#[derive(Debug, Clone)]
pub struct RelayConfig {
    /// Subscriber queue settings
    pub registry: RegistryConfig,

    /// Queue the latest known positions for a filter when it is subscribed
    pub catchup_on_subscribe: bool,

    /// Accept `"ts": [n]` payloads
    pub lenient_decode: bool,

    /// Latest positions older than this are evicted
    pub publisher_ttl: Duration,

    /// How often the cleanup task runs
    pub cleanup_interval: Duration,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            registry: RegistryConfig::default(),
            catchup_on_subscribe: true,
            lenient_decode: true,
            publisher_ttl: Duration::from_secs(300),
            cleanup_interval: Duration::from_secs(30),
        }
    }
}

impl RelayConfig {
    /// Set the subscriber queue settings
    pub fn registry(mut self, registry: RegistryConfig) -> Self {
        self.registry = registry;
        self
    }

    /// Enable or disable late-joiner catch-up
    pub fn catchup_on_subscribe(mut self, enabled: bool) -> Self {
        self.catchup_on_subscribe = enabled;
        self
    }

    /// Enable or disable lenient payload decoding
    pub fn lenient_decode(mut self, enabled: bool) -> Self {
        self.lenient_decode = enabled;
        self
    }

    /// Set how long a publisher's latest position is retained
    pub fn publisher_ttl(mut self, ttl: Duration) -> Self {
        self.publisher_ttl = ttl;
        self
    }

    /// Set the cleanup interval
    pub fn cleanup_interval(mut self, interval: Duration) -> Self {
        self.cleanup_interval = interval;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = RelayConfig::default();
        assert!(config.catchup_on_subscribe);
        assert!(config.lenient_decode);
        assert_eq!(config.publisher_ttl, Duration::from_secs(300));
        assert_eq!(config.cleanup_interval, Duration::from_secs(30));
    }

    #[test]
    fn test_builder_chaining() {
        let config = RelayConfig::default()
            .registry(RegistryConfig::default().queue_capacity(2))
            .catchup_on_subscribe(false)
            .lenient_decode(false)
            .publisher_ttl(Duration::from_secs(10))
            .cleanup_interval(Duration::from_secs(1));

        assert_eq!(config.registry.queue_capacity, 2);
        assert!(!config.catchup_on_subscribe);
        assert!(!config.lenient_decode);
        assert_eq!(config.publisher_ttl, Duration::from_secs(10));
        assert_eq!(config.cleanup_interval, Duration::from_secs(1));
    }
}

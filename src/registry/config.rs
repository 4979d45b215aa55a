//! Subscription registry configuration

use std::time::Duration;

/// Default per-subscriber queue capacity
pub const DEFAULT_QUEUE_CAPACITY: usize = 64;

/// Default time a drain waits for the first delivery
pub const DEFAULT_DRAIN_TIMEOUT: Duration = Duration::from_secs(1);

/// Registry configuration options
#[derive(Debug, Clone)]
pub struct RegistryConfig {
    /// Maximum deliveries held per subscriber before new ones are dropped
    pub queue_capacity: usize,

    /// How long `drain` waits for at least one delivery
    pub drain_timeout: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            drain_timeout: DEFAULT_DRAIN_TIMEOUT,
        }
    }
}

impl RegistryConfig {
    /// Set the per-subscriber queue capacity (minimum 1)
    pub fn queue_capacity(mut self, capacity: usize) -> Self {
        self.queue_capacity = capacity.max(1);
        self
    }

    /// Set the drain timeout
    pub fn drain_timeout(mut self, timeout: Duration) -> Self {
        self.drain_timeout = timeout;
        self
    }
}

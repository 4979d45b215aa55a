//! Statistics for the relay and its sessions

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// Outcome of one accepted publish
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PublishReceipt {
    /// Subscribers whose filter matched the topic
    pub matched: usize,
    /// Subscribers whose queue accepted the record
    pub delivered: usize,
    /// Subscribers whose queue was full
    pub dropped: usize,
}

/// Relay-wide counters
///
/// Updated lock-free from the publish path.
#[derive(Debug)]
pub struct RelayStats {
    started_at: Instant,
    published: AtomicU64,
    rejected: AtomicU64,
    delivered: AtomicU64,
    dropped: AtomicU64,
}

impl RelayStats {
    /// Create zeroed counters, with uptime starting now
    pub fn new() -> Self {
        Self {
            started_at: Instant::now(),
            published: AtomicU64::new(0),
            rejected: AtomicU64::new(0),
            delivered: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
        }
    }

    /// Count an accepted publish and its fan-out
    pub fn record_publish(&self, receipt: &PublishReceipt) {
        self.published.fetch_add(1, Ordering::Relaxed);
        self.delivered
            .fetch_add(receipt.delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(receipt.dropped as u64, Ordering::Relaxed);
    }

    /// Count a publish rejected at decode
    pub fn record_rejected(&self) {
        self.rejected.fetch_add(1, Ordering::Relaxed);
    }

    /// Count deliveries queued outside of a publish (late-joiner catch-up)
    pub fn record_catchup(&self, delivered: usize, dropped: usize) {
        self.delivered.fetch_add(delivered as u64, Ordering::Relaxed);
        self.dropped.fetch_add(dropped as u64, Ordering::Relaxed);
    }

    /// Point-in-time copy of the counters
    pub fn snapshot(&self) -> RelayStatsSnapshot {
        RelayStatsSnapshot {
            uptime: self.started_at.elapsed(),
            published: self.published.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            delivered: self.delivered.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            publishers: 0,
            subscribers: 0,
            filters: 0,
        }
    }
}

impl Default for RelayStats {
    fn default() -> Self {
        Self::new()
    }
}

/// Copy of the relay counters plus current gauges
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RelayStatsSnapshot {
    /// Time since the relay was created
    pub uptime: Duration,
    /// Publishes accepted
    pub published: u64,
    /// Publishes rejected at decode
    pub rejected: u64,
    /// Deliveries accepted into subscriber queues
    pub delivered: u64,
    /// Deliveries dropped on full queues
    pub dropped: u64,
    /// Publishers with a latest known position
    pub publishers: usize,
    /// Connected subscribers
    pub subscribers: usize,
    /// Registered (filter, subscriber) pairs
    pub filters: usize,
}

/// Session-level statistics
#[derive(Debug, Clone, Default)]
pub struct SessionStats {
    /// Total bytes sent
    pub bytes_sent: u64,
    /// Command lines received
    pub commands: u64,
    /// Publishes accepted
    pub published: u64,
    /// Publishes rejected
    pub rejected: u64,
    /// Messages written to this session as a subscriber
    pub messages_sent: u64,
}

impl SessionStats {
    /// Create new stats tracker
    pub fn new() -> Self {
        Self::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_stats_new() {
        let stats = RelayStats::new().snapshot();
        assert_eq!(stats.published, 0);
        assert_eq!(stats.rejected, 0);
        assert_eq!(stats.delivered, 0);
        assert_eq!(stats.dropped, 0);
    }

    #[test]
    fn test_record_publish() {
        let stats = RelayStats::new();
        stats.record_publish(&PublishReceipt {
            matched: 3,
            delivered: 2,
            dropped: 1,
        });
        stats.record_publish(&PublishReceipt::default());
        stats.record_rejected();

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.published, 2);
        assert_eq!(snapshot.rejected, 1);
        assert_eq!(snapshot.delivered, 2);
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn test_record_catchup() {
        let stats = RelayStats::new();
        stats.record_catchup(4, 1);

        let snapshot = stats.snapshot();
        assert_eq!(snapshot.published, 0);
        assert_eq!(snapshot.delivered, 4);
        assert_eq!(snapshot.dropped, 1);
    }

    #[test]
    fn test_session_stats_new() {
        let stats = SessionStats::new();
        assert_eq!(stats.bytes_sent, 0);
        assert_eq!(stats.commands, 0);
        assert_eq!(stats.messages_sent, 0);
    }
}

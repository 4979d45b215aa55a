//! Relay core implementation
//!
//! Decodes publishes, keeps the latest position per publisher and fans each
//! record out to the subscribers whose filters match its topic.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;
use tokio::time::Instant;

use super::config::RelayConfig;
use super::error::PublishError;
use crate::codec::{Codec, PositionRecord};
use crate::registry::{
    Delivery, Drained, EnqueueOutcome, RegistryError, SubscriberId, SubscriptionRegistry,
};
use crate::router::{Topic, TopicFilter, TopicRouter};
use crate::stats::{PublishReceipt, RelayStats, RelayStatsSnapshot};

/// Most recent accepted record for one publisher
#[derive(Debug, Clone)]
pub struct LatestPosition {
    /// Topic the record was published on
    pub topic: Topic,
    /// The record
    pub record: Arc<PositionRecord>,
    /// When the relay accepted it
    pub received_at: Instant,
}

/// Central relay shared by all sessions
///
/// Lock order is always latest → router → registry, so publish, subscribe
/// and disconnect can run concurrently without deadlocking.
pub struct Relay {
    /// Latest position per publisher id, replaced on every accepted record
    latest: RwLock<HashMap<String, LatestPosition>>,

    router: RwLock<TopicRouter>,

    registry: SubscriptionRegistry,

    codec: Codec,

    stats: RelayStats,

    config: RelayConfig,
}

impl Relay {
    /// Create a new relay with default configuration
    pub fn new() -> Self {
        Self::with_config(RelayConfig::default())
    }

    /// Create a new relay with custom configuration
    pub fn with_config(config: RelayConfig) -> Self {
        Self {
            latest: RwLock::new(HashMap::new()),
            router: RwLock::new(TopicRouter::new()),
            registry: SubscriptionRegistry::with_config(config.registry.clone()),
            codec: Codec::with_lenient(config.lenient_decode),
            stats: RelayStats::new(),
            config,
        }
    }

    /// Get the relay configuration
    pub fn config(&self) -> &RelayConfig {
        &self.config
    }

    /// Get the subscription registry
    pub fn registry(&self) -> &SubscriptionRegistry {
        &self.registry
    }

    /// Accept a raw payload published on `topic`
    ///
    /// Only decode failures are reported. Full queues and subscribers that
    /// disconnect mid-publish show up in the receipt, never as an error.
    ///
    /// The latest-state write lock is held until every matched queue has been
    /// offered the record, so two publishes never interleave their fan-out and
    /// each subscriber sees a publisher's records in acceptance order.
    pub async fn publish(&self, topic: &Topic, raw: &[u8]) -> Result<PublishReceipt, PublishError> {
        let record = match self.codec.decode(raw) {
            Ok(record) => Arc::new(record),
            Err(e) => {
                self.stats.record_rejected();
                tracing::debug!(topic = %topic, error = %e, "Publish rejected");
                return Err(e.into());
            }
        };

        let mut latest = self.latest.write().await;
        latest.insert(
            record.publisher_id().to_owned(),
            LatestPosition {
                topic: topic.clone(),
                record: Arc::clone(&record),
                received_at: Instant::now(),
            },
        );

        let matched = self.router.read().await.match_topic(topic);
        let delivery = Delivery::new(topic.clone(), Arc::clone(&record));

        let mut receipt = PublishReceipt {
            matched: matched.len(),
            ..Default::default()
        };

        for id in matched {
            match self.registry.enqueue(id, delivery.clone()).await {
                Ok(EnqueueOutcome::Queued) => receipt.delivered += 1,
                Ok(EnqueueOutcome::Dropped) => receipt.dropped += 1,
                Err(RegistryError::UnknownSubscriber(id)) => {
                    tracing::trace!(subscriber = %id, "Subscriber left during publish");
                }
            }
        }

        drop(latest);

        self.stats.record_publish(&receipt);
        tracing::trace!(
            topic = %topic,
            publisher = record.publisher_id(),
            matched = receipt.matched,
            dropped = receipt.dropped,
            "Published"
        );

        Ok(receipt)
    }

    /// Register a new subscriber
    pub async fn connect(&self) -> SubscriberId {
        self.registry.connect().await
    }

    /// Subscribe `id` to `filter`
    ///
    /// With catch-up enabled, the latest position of every publisher whose
    /// last topic matches the filter is queued right away, ordered by
    /// publisher id. Positions on topics the subscriber's other filters
    /// already cover are skipped; those were offered to it before.
    /// Returns how many catch-up records were queued.
    pub async fn subscribe(
        &self,
        id: SubscriberId,
        filter: TopicFilter,
    ) -> Result<usize, RegistryError> {
        let existing = self.registry.filters(id).await?;
        self.registry.add_filter(id, filter.clone()).await?;

        // Holding the read lock keeps publishes out, so catch-up and live
        // deliveries neither overlap nor leave a gap.
        let latest = self.latest.read().await;

        let added = self.router.write().await.subscribe(&filter, id);
        if !self.registry.contains(id).await {
            // Disconnected between add_filter and now
            self.router.write().await.unsubscribe(&filter, id);
            return Err(RegistryError::UnknownSubscriber(id));
        }

        tracing::debug!(subscriber = %id, filter = %filter, "Subscribed");

        if !added || !self.config.catchup_on_subscribe {
            return Ok(0);
        }

        let mut catchup: Vec<(&String, &LatestPosition)> = latest
            .iter()
            .filter(|(_, pos)| filter.matches(&pos.topic))
            .filter(|(_, pos)| !existing.iter().any(|f| f.matches(&pos.topic)))
            .collect();
        catchup.sort_by(|a, b| a.0.cmp(b.0));

        let (mut delivered, mut dropped) = (0, 0);
        for (_, pos) in catchup {
            let delivery = Delivery::new(pos.topic.clone(), Arc::clone(&pos.record));
            match self.registry.enqueue(id, delivery).await? {
                EnqueueOutcome::Queued => delivered += 1,
                EnqueueOutcome::Dropped => dropped += 1,
            }
        }
        self.stats.record_catchup(delivered, dropped);

        Ok(delivered)
    }

    /// Remove `filter` from `id`
    pub async fn unsubscribe(
        &self,
        id: SubscriberId,
        filter: &TopicFilter,
    ) -> Result<bool, RegistryError> {
        self.registry.remove_filter(id, filter).await?;
        let removed = self.router.write().await.unsubscribe(filter, id);

        tracing::debug!(subscriber = %id, filter = %filter, removed, "Unsubscribed");
        Ok(removed)
    }

    /// Drop a subscriber and every filter it held
    pub async fn disconnect(&self, id: SubscriberId) -> Result<(), RegistryError> {
        let filters = self.registry.disconnect(id).await?;
        self.router.write().await.unsubscribe_all(&filters, id);
        Ok(())
    }

    /// Take pending deliveries for `id`
    pub async fn drain(&self, id: SubscriberId) -> Result<Drained, RegistryError> {
        self.registry.drain(id).await
    }

    /// Latest accepted record for a publisher
    pub async fn latest(&self, publisher_id: &str) -> Option<Arc<PositionRecord>> {
        self.latest
            .read()
            .await
            .get(publisher_id)
            .map(|pos| Arc::clone(&pos.record))
    }

    /// Latest position of every known publisher, ordered by publisher id
    pub async fn latest_snapshot(&self) -> Vec<LatestPosition> {
        let latest = self.latest.read().await;
        let mut entries: Vec<(&String, &LatestPosition)> = latest.iter().collect();
        entries.sort_by(|a, b| a.0.cmp(b.0));
        entries.into_iter().map(|(_, pos)| pos.clone()).collect()
    }

    /// Remove latest positions older than `publisher_ttl`
    pub async fn evict_stale(&self) -> usize {
        let ttl = self.config.publisher_ttl;
        let mut latest = self.latest.write().await;
        let before = latest.len();

        latest.retain(|publisher, pos| {
            let keep = pos.received_at.elapsed() <= ttl;
            if !keep {
                tracing::debug!(publisher = %publisher, "Publisher state evicted");
            }
            keep
        });

        before - latest.len()
    }

    /// Spawn background cleanup task
    ///
    /// Returns a handle that can be used to abort the task.
    pub fn spawn_cleanup_task(self: &Arc<Self>) -> tokio::task::JoinHandle<()> {
        let relay = Arc::clone(self);
        let interval = relay.config.cleanup_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            loop {
                ticker.tick().await;
                let evicted = relay.evict_stale().await;
                if evicted > 0 {
                    tracing::info!(evicted, "Stale publishers removed by cleanup");
                }
            }
        })
    }

    /// Counters plus current gauges
    pub async fn stats(&self) -> RelayStatsSnapshot {
        let mut snapshot = self.stats.snapshot();
        snapshot.publishers = self.latest.read().await.len();
        snapshot.filters = self.router.read().await.filter_count();
        snapshot.subscribers = self.registry.subscriber_count().await;
        snapshot
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use super::*;
    use crate::codec::{encode, DecodeError};
    use crate::registry::RegistryConfig;

    fn topic(s: &str) -> Topic {
        Topic::new(s).unwrap()
    }

    fn filter(s: &str) -> TopicFilter {
        TopicFilter::new(s).unwrap()
    }

    fn payload(ts: u64, uuid: &str) -> Vec<u8> {
        encode(&PositionRecord::new(ts, uuid, "drone", 48.85, 2.21).unwrap()).to_vec()
    }

    fn fast_relay(capacity: usize) -> Relay {
        Relay::with_config(
            RelayConfig::default().registry(
                RegistryConfig::default()
                    .queue_capacity(capacity)
                    .drain_timeout(Duration::from_millis(50)),
            ),
        )
    }

    async fn drain_ts(relay: &Relay, id: SubscriberId) -> Vec<u64> {
        relay
            .drain(id)
            .await
            .unwrap()
            .map(|d| d.record.timestamp())
            .collect()
    }

    #[tokio::test]
    async fn test_end_to_end_scenario() {
        let relay = fast_relay(8);
        let id = relay.connect().await;
        relay.subscribe(id, filter("drone/position")).await.unwrap();

        let raw = br#"{"ts":1531604906,"uuid":"7ebf7ece-1332-44ad-8f3a-db72245eded5","name":"drone1","latitude":48.8515,"longitude":2.2119}"#;
        let receipt = relay.publish(&topic("drone/position"), raw).await.unwrap();
        assert_eq!(receipt.matched, 1);
        assert_eq!(receipt.delivered, 1);

        let drained: Vec<Delivery> = relay.drain(id).await.unwrap().collect();
        assert_eq!(drained.len(), 1);
        let expected =
            PositionRecord::new(1531604906, "7ebf7ece-1332-44ad-8f3a-db72245eded5", "drone1", 48.8515, 2.2119)
                .unwrap();
        assert_eq!(*drained[0].record, expected);
        assert_eq!(drained[0].topic, topic("drone/position"));
    }

    #[tokio::test]
    async fn test_decode_failure_touches_nothing() {
        let relay = fast_relay(8);
        let id = relay.connect().await;
        relay.subscribe(id, filter("#")).await.unwrap();

        let err = relay.publish(&topic("drone/position"), b"{oops").await.unwrap_err();
        assert!(matches!(err, PublishError::Decode(DecodeError::Malformed(_))));

        let missing = br#"{"ts":1,"name":"d","latitude":1.0,"longitude":1.0}"#;
        let err = relay.publish(&topic("drone/position"), missing).await.unwrap_err();
        assert_eq!(err, PublishError::Decode(DecodeError::InvalidField("uuid")));

        assert!(relay.latest_snapshot().await.is_empty());
        assert!(relay.drain(id).await.unwrap().is_empty());

        let stats = relay.stats().await;
        assert_eq!(stats.rejected, 2);
        assert_eq!(stats.published, 0);
    }

    #[tokio::test]
    async fn test_latest_wins_by_arrival() {
        let relay = fast_relay(8);

        // R2 carries an older embedded timestamp but arrives last
        relay.publish(&topic("drone/position"), &payload(200, "a")).await.unwrap();
        relay.publish(&topic("drone/position"), &payload(100, "a")).await.unwrap();

        let latest = relay.latest("a").await.unwrap();
        assert_eq!(latest.timestamp(), 100);
        assert_eq!(relay.latest_snapshot().await.len(), 1);
    }

    #[tokio::test]
    async fn test_routing_wildcard() {
        let relay = fast_relay(8);
        let id = relay.connect().await;
        relay.subscribe(id, filter("drone/#")).await.unwrap();

        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();
        relay.publish(&topic("drone/battery"), &payload(2, "a")).await.unwrap();
        let receipt = relay.publish(&topic("rover/position"), &payload(3, "b")).await.unwrap();
        assert_eq!(receipt.matched, 0);

        assert_eq!(drain_ts(&relay, id).await, vec![1, 2]);
    }

    #[tokio::test]
    async fn test_fifo_per_publisher() {
        let relay = fast_relay(16);
        let a = relay.connect().await;
        let b = relay.connect().await;
        relay.subscribe(a, filter("drone/position")).await.unwrap();
        relay.subscribe(b, filter("drone/#")).await.unwrap();

        for ts in 1..=5 {
            relay.publish(&topic("drone/position"), &payload(ts, "a")).await.unwrap();
        }

        assert_eq!(drain_ts(&relay, a).await, vec![1, 2, 3, 4, 5]);
        assert_eq!(drain_ts(&relay, b).await, vec![1, 2, 3, 4, 5]);
    }

    #[tokio::test]
    async fn test_backpressure_drop_newest() {
        let relay = fast_relay(1);
        let id = relay.connect().await;
        relay.subscribe(id, filter("drone/position")).await.unwrap();

        let first = relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();
        let second = relay.publish(&topic("drone/position"), &payload(2, "a")).await.unwrap();

        // Publisher is never failed because of a full queue
        assert_eq!(first.delivered, 1);
        assert_eq!(second.dropped, 1);

        let sub = relay.registry().subscriber_stats(id).await.unwrap();
        assert_eq!(sub.dropped, 1);
        assert_eq!(drain_ts(&relay, id).await, vec![1]);

        // Latest state still moved on
        assert_eq!(relay.latest("a").await.unwrap().timestamp(), 2);
        assert_eq!(relay.stats().await.dropped, 1);
    }

    #[tokio::test]
    async fn test_disconnect_isolation() {
        let relay = Arc::new(Relay::with_config(RelayConfig::default().registry(
            RegistryConfig::default().drain_timeout(Duration::from_secs(30)),
        )));
        let a = relay.connect().await;
        let b = relay.connect().await;
        relay.subscribe(a, filter("drone/position")).await.unwrap();
        relay.subscribe(b, filter("drone/position")).await.unwrap();

        let waiter = {
            let relay = Arc::clone(&relay);
            tokio::spawn(async move { relay.drain(b).await })
        };

        tokio::time::sleep(Duration::from_millis(10)).await;
        relay.disconnect(a).await.unwrap();
        let receipt = relay.publish(&topic("drone/position"), &payload(7, "x")).await.unwrap();
        assert_eq!(receipt.matched, 1);

        let got: Vec<u64> = waiter
            .await
            .unwrap()
            .unwrap()
            .map(|d| d.record.timestamp())
            .collect();
        assert_eq!(got, vec![7]);
        assert!(relay.drain(a).await.is_err());
    }

    #[tokio::test]
    async fn test_disconnect_cleans_router() {
        let relay = fast_relay(4);
        let id = relay.connect().await;
        relay.subscribe(id, filter("drone/#")).await.unwrap();
        relay.subscribe(id, filter("rover/position")).await.unwrap();
        assert_eq!(relay.stats().await.filters, 2);

        relay.disconnect(id).await.unwrap();

        let stats = relay.stats().await;
        assert_eq!(stats.filters, 0);
        assert_eq!(stats.subscribers, 0);
        assert!(matches!(
            relay.disconnect(id).await,
            Err(RegistryError::UnknownSubscriber(_))
        ));
    }

    #[tokio::test]
    async fn test_unsubscribe_stops_delivery() {
        let relay = fast_relay(4);
        let id = relay.connect().await;
        let f = filter("drone/position");
        relay.subscribe(id, f.clone()).await.unwrap();

        assert!(relay.unsubscribe(id, &f).await.unwrap());
        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();

        assert!(relay.drain(id).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_subscribe_unknown_subscriber() {
        let relay = fast_relay(4);
        let result = relay.subscribe(SubscriberId::from(99), filter("#")).await;
        assert_eq!(result, Err(RegistryError::UnknownSubscriber(SubscriberId::from(99))));
        assert_eq!(relay.stats().await.filters, 0);
    }

    #[tokio::test]
    async fn test_catchup_on_subscribe() {
        let relay = fast_relay(8);
        relay.publish(&topic("drone/position"), &payload(1, "b")).await.unwrap();
        relay.publish(&topic("drone/position"), &payload(2, "a")).await.unwrap();
        relay.publish(&topic("rover/position"), &payload(3, "c")).await.unwrap();

        let id = relay.connect().await;
        let queued = relay.subscribe(id, filter("drone/#")).await.unwrap();
        assert_eq!(queued, 2);

        // Ordered by publisher id: "a" then "b"
        assert_eq!(drain_ts(&relay, id).await, vec![2, 1]);

        // Re-subscribing the same filter does not replay
        assert_eq!(relay.subscribe(id, filter("drone/#")).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_catchup_skips_topics_already_covered() {
        let relay = fast_relay(8);
        let id = relay.connect().await;
        relay.subscribe(id, filter("drone/position")).await.unwrap();

        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();
        relay.publish(&topic("drone/battery"), &payload(2, "b")).await.unwrap();
        assert_eq!(drain_ts(&relay, id).await, vec![1]);

        // Only the battery topic is new to this subscriber
        assert_eq!(relay.subscribe(id, filter("drone/#")).await.unwrap(), 1);
        assert_eq!(drain_ts(&relay, id).await, vec![2]);

        // Live publishes still arrive once despite two matching filters
        relay.publish(&topic("drone/position"), &payload(3, "a")).await.unwrap();
        assert_eq!(drain_ts(&relay, id).await, vec![3]);
    }

    #[tokio::test]
    async fn test_catchup_after_unsubscribe_replays() {
        let relay = fast_relay(8);
        let id = relay.connect().await;
        let exact = filter("drone/position");
        relay.subscribe(id, exact.clone()).await.unwrap();
        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();
        assert_eq!(drain_ts(&relay, id).await, vec![1]);

        relay.unsubscribe(id, &exact).await.unwrap();
        assert_eq!(relay.subscribe(id, filter("drone/#")).await.unwrap(), 1);
        assert_eq!(drain_ts(&relay, id).await, vec![1]);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_publishers() {
        const PUBLISHERS: u64 = 8;
        const RECORDS: u64 = 50;

        let relay = Arc::new(fast_relay((PUBLISHERS * RECORDS) as usize));
        let exact = relay.connect().await;
        let wildcard = relay.connect().await;
        relay.subscribe(exact, filter("drone/position")).await.unwrap();
        relay.subscribe(wildcard, filter("drone/#")).await.unwrap();

        let tasks: Vec<_> = (0..PUBLISHERS)
            .map(|p| {
                let relay = Arc::clone(&relay);
                tokio::spawn(async move {
                    let uuid = format!("drone-{p}");
                    for ts in 1..=RECORDS {
                        relay
                            .publish(&topic("drone/position"), &payload(ts, &uuid))
                            .await
                            .unwrap();
                        tokio::task::yield_now().await;
                    }
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        for id in [exact, wildcard] {
            let mut seen: HashMap<String, Vec<u64>> = HashMap::new();
            for delivery in relay.drain(id).await.unwrap() {
                seen.entry(delivery.record.publisher_id().to_owned())
                    .or_default()
                    .push(delivery.record.timestamp());
            }

            assert_eq!(seen.len(), PUBLISHERS as usize);
            for timestamps in seen.values() {
                assert_eq!(*timestamps, (1..=RECORDS).collect::<Vec<_>>());
            }
        }

        let snapshot = relay.latest_snapshot().await;
        assert_eq!(snapshot.len(), PUBLISHERS as usize);
        for pos in &snapshot {
            assert_eq!(pos.record.timestamp(), RECORDS);
            assert_eq!(pos.topic, topic("drone/position"));
        }

        let stats = relay.stats().await;
        assert_eq!(stats.published, PUBLISHERS * RECORDS);
        assert_eq!(stats.dropped, 0);
    }

    #[tokio::test]
    async fn test_catchup_disabled() {
        let relay = Relay::with_config(RelayConfig::default().catchup_on_subscribe(false));
        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();

        let id = relay.connect().await;
        assert_eq!(relay.subscribe(id, filter("#")).await.unwrap(), 0);
        assert_eq!(relay.registry().subscriber_stats(id).await.unwrap().queued, 0);
    }

    #[tokio::test]
    async fn test_strict_decode() {
        let relay = Relay::with_config(RelayConfig::default().lenient_decode(false));
        let raw = br#"{"ts":[1],"uuid":"u","name":"d","latitude":1.0,"longitude":1.0}"#;
        assert_eq!(
            relay.publish(&topic("drone/position"), raw).await,
            Err(PublishError::Decode(DecodeError::InvalidField("ts")))
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_evict_stale() {
        let relay = Relay::with_config(RelayConfig::default().publisher_ttl(Duration::from_secs(60)));
        relay.publish(&topic("drone/position"), &payload(1, "old")).await.unwrap();

        tokio::time::advance(Duration::from_secs(45)).await;
        relay.publish(&topic("drone/position"), &payload(2, "new")).await.unwrap();
        assert_eq!(relay.evict_stale().await, 0);

        tokio::time::advance(Duration::from_secs(30)).await;
        assert_eq!(relay.evict_stale().await, 1);
        assert!(relay.latest("old").await.is_none());
        assert!(relay.latest("new").await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_cleanup_task() {
        let relay = Arc::new(Relay::with_config(
            RelayConfig::default()
                .publisher_ttl(Duration::from_secs(5))
                .cleanup_interval(Duration::from_secs(1)),
        ));
        relay.publish(&topic("drone/position"), &payload(1, "a")).await.unwrap();

        let handle = relay.spawn_cleanup_task();
        tokio::time::sleep(Duration::from_secs(10)).await;

        assert!(relay.latest("a").await.is_none());
        handle.abort();
    }
}

//! Subscription registry implementation
//!
//! Owns every subscriber and its delivery queue.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::RwLock;

use super::config::RegistryConfig;
use super::entry::{Drained, EnqueueOutcome, SubscriberEntry, SubscriberId, SubscriberStats};
use super::error::RegistryError;
use super::frame::Delivery;
use crate::router::TopicFilter;

/// Registry of connected subscribers
///
/// The map lock is only held long enough to look up an entry; queue
/// operations happen on the entry itself, so subscribers never contend with
/// each other.
pub struct SubscriptionRegistry {
    subscribers: RwLock<HashMap<SubscriberId, Arc<SubscriberEntry>>>,

    next_id: AtomicU64,

    config: RegistryConfig,
}

impl SubscriptionRegistry {
    /// Create a new registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a new registry with custom configuration
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            subscribers: RwLock::new(HashMap::new()),
            next_id: AtomicU64::new(1),
            config,
        }
    }

    /// Get the registry configuration
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    /// Register a new subscriber with an empty queue
    pub async fn connect(&self) -> SubscriberId {
        let id = SubscriberId::from(self.next_id.fetch_add(1, Ordering::Relaxed));
        let entry = SubscriberEntry::new(id, self.config.queue_capacity);

        self.subscribers.write().await.insert(id, Arc::new(entry));

        tracing::debug!(subscriber = %id, capacity = self.config.queue_capacity, "Subscriber connected");
        id
    }

    /// Remove a subscriber
    ///
    /// The id is invalid as soon as this returns; a drain waiting on it wakes
    /// up empty. Returns the filters the subscriber held so the caller can
    /// clean up routing.
    pub async fn disconnect(&self, id: SubscriberId) -> Result<Vec<TopicFilter>, RegistryError> {
        let entry = self
            .subscribers
            .write()
            .await
            .remove(&id)
            .ok_or(RegistryError::UnknownSubscriber(id))?;

        entry.cancel();
        let filters = entry.take_filters().await;

        tracing::debug!(subscriber = %id, filters = filters.len(), "Subscriber disconnected");
        Ok(filters)
    }

    /// Offer a delivery to one subscriber's queue
    ///
    /// Never waits for queue space. A full queue drops the incoming delivery.
    pub async fn enqueue(
        &self,
        id: SubscriberId,
        delivery: Delivery,
    ) -> Result<EnqueueOutcome, RegistryError> {
        let entry = self.entry(id).await?;
        let outcome = entry.try_enqueue(delivery);

        if outcome == EnqueueOutcome::Dropped {
            tracing::trace!(subscriber = %id, "Queue full, delivery dropped");
        }

        Ok(outcome)
    }

    /// Take queued deliveries, waiting up to the drain timeout for the first
    pub async fn drain(&self, id: SubscriberId) -> Result<Drained, RegistryError> {
        let entry = self.entry(id).await?;
        Ok(entry
            .drain(self.config.drain_timeout, self.config.queue_capacity)
            .await)
    }

    /// Record that `id` is registered under `filter`
    pub async fn add_filter(
        &self,
        id: SubscriberId,
        filter: TopicFilter,
    ) -> Result<bool, RegistryError> {
        let entry = self.entry(id).await?;
        Ok(entry.add_filter(filter).await)
    }

    /// Forget that `id` is registered under `filter`
    pub async fn remove_filter(
        &self,
        id: SubscriberId,
        filter: &TopicFilter,
    ) -> Result<bool, RegistryError> {
        let entry = self.entry(id).await?;
        Ok(entry.remove_filter(filter).await)
    }

    /// Filters `id` is currently registered under
    pub async fn filters(&self, id: SubscriberId) -> Result<Vec<TopicFilter>, RegistryError> {
        let entry = self.entry(id).await?;
        Ok(entry.filters().await)
    }

    /// Whether `id` is currently connected
    pub async fn contains(&self, id: SubscriberId) -> bool {
        self.subscribers.read().await.contains_key(&id)
    }

    /// Get subscriber statistics
    pub async fn subscriber_stats(&self, id: SubscriberId) -> Option<SubscriberStats> {
        let entry = self.entry(id).await.ok()?;
        Some(entry.stats().await)
    }

    /// Get total number of connected subscribers
    pub async fn subscriber_count(&self) -> usize {
        self.subscribers.read().await.len()
    }

    async fn entry(&self, id: SubscriberId) -> Result<Arc<SubscriberEntry>, RegistryError> {
        self.subscribers
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(RegistryError::UnknownSubscriber(id))
    }
}

impl Default for SubscriptionRegistry {
    fn default() -> Self {
        Self::new()
    }
}

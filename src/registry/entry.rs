//! Subscriber entry and queue types
//!
//! Each subscriber owns a bounded queue. The relay is the only producer
//! (`try_enqueue`) and the subscriber's session the only consumer (`drain`).

use std::collections::BTreeSet;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

use tokio::sync::{mpsc, Mutex};
use tokio_util::sync::CancellationToken;

use super::frame::Delivery;
use crate::router::TopicFilter;

/// Opaque subscriber identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SubscriberId(u64);

impl SubscriberId {
    /// Raw numeric value
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl From<u64> for SubscriberId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SubscriberId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Result of offering a delivery to a subscriber queue
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnqueueOutcome {
    /// Delivery is in the queue
    Queued,
    /// Queue was full; the incoming delivery was discarded
    Dropped,
}

/// Entry for a single subscriber in the registry
pub struct SubscriberEntry {
    id: SubscriberId,

    tx: mpsc::Sender<Delivery>,

    rx: Mutex<mpsc::Receiver<Delivery>>,

    /// Filters this subscriber is registered under in the router
    filters: Mutex<BTreeSet<TopicFilter>>,

    /// Fired on disconnect to release any waiting drain
    cancel: CancellationToken,

    enqueued: AtomicU64,

    dropped: AtomicU64,

    connected_at: Instant,
}

impl SubscriberEntry {
    pub(super) fn new(id: SubscriberId, capacity: usize) -> Self {
        let (tx, rx) = mpsc::channel(capacity);

        Self {
            id,
            tx,
            rx: Mutex::new(rx),
            filters: Mutex::new(BTreeSet::new()),
            cancel: CancellationToken::new(),
            enqueued: AtomicU64::new(0),
            dropped: AtomicU64::new(0),
            connected_at: Instant::now(),
        }
    }

    /// Subscriber id
    pub fn id(&self) -> SubscriberId {
        self.id
    }

    /// Offer a delivery without waiting
    pub(super) fn try_enqueue(&self, delivery: Delivery) -> EnqueueOutcome {
        match self.tx.try_send(delivery) {
            Ok(()) => {
                self.enqueued.fetch_add(1, Ordering::Relaxed);
                EnqueueOutcome::Queued
            }
            Err(mpsc::error::TrySendError::Full(_)) | Err(mpsc::error::TrySendError::Closed(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                EnqueueOutcome::Dropped
            }
        }
    }

    /// Wait up to `timeout` for a delivery, then take everything queued
    ///
    /// Returns early and empty if the subscriber is cancelled while waiting.
    pub(super) async fn drain(&self, timeout: Duration, max: usize) -> Drained {
        let mut rx = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Drained::empty(),
            rx = self.rx.lock() => rx,
        };

        let first = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => None,
            received = tokio::time::timeout(timeout, rx.recv()) => received.ok().flatten(),
        };

        let Some(first) = first else {
            return Drained::empty();
        };

        let mut items = Vec::with_capacity(max.min(16));
        items.push(first);
        while items.len() < max {
            match rx.try_recv() {
                Ok(delivery) => items.push(delivery),
                Err(_) => break,
            }
        }

        Drained::new(items)
    }

    pub(super) fn cancel(&self) {
        self.cancel.cancel();
    }

    /// Whether this subscriber has been disconnected
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    pub(super) async fn add_filter(&self, filter: TopicFilter) -> bool {
        self.filters.lock().await.insert(filter)
    }

    pub(super) async fn remove_filter(&self, filter: &TopicFilter) -> bool {
        self.filters.lock().await.remove(filter)
    }

    /// Filters currently held, in order
    pub async fn filters(&self) -> Vec<TopicFilter> {
        self.filters.lock().await.iter().cloned().collect()
    }

    pub(super) async fn take_filters(&self) -> Vec<TopicFilter> {
        std::mem::take(&mut *self.filters.lock().await)
            .into_iter()
            .collect()
    }

    /// Deliveries currently waiting in the queue
    pub fn queued(&self) -> usize {
        self.tx.max_capacity() - self.tx.capacity()
    }

    /// Snapshot of this subscriber's counters
    pub async fn stats(&self) -> SubscriberStats {
        SubscriberStats {
            id: self.id,
            filters: self.filters.lock().await.len(),
            queued: self.queued(),
            enqueued: self.enqueued.load(Ordering::Relaxed),
            dropped: self.dropped.load(Ordering::Relaxed),
            connected_for: self.connected_at.elapsed(),
        }
    }
}

/// Deliveries taken from a queue by one `drain` call
///
/// Finite; the next `drain` starts a fresh batch.
#[derive(Debug)]
pub struct Drained {
    items: std::vec::IntoIter<Delivery>,
}

impl Drained {
    fn new(items: Vec<Delivery>) -> Self {
        Self {
            items: items.into_iter(),
        }
    }

    fn empty() -> Self {
        Self::new(Vec::new())
    }

    /// Whether nothing is left in this batch
    pub fn is_empty(&self) -> bool {
        self.items.len() == 0
    }
}

impl Iterator for Drained {
    type Item = Delivery;

    fn next(&mut self) -> Option<Delivery> {
        self.items.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.items.size_hint()
    }
}

impl ExactSizeIterator for Drained {}

/// Statistics for a subscriber
#[derive(Debug, Clone)]
pub struct SubscriberStats {
    /// Subscriber id
    pub id: SubscriberId,
    /// Number of filters registered
    pub filters: usize,
    /// Deliveries waiting to be drained
    pub queued: usize,
    /// Deliveries accepted into the queue since connect
    pub enqueued: u64,
    /// Deliveries dropped because the queue was full
    pub dropped: u64,
    /// Time since connect
    pub connected_for: Duration,
}

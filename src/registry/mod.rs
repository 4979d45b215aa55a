//! Subscription registry
//!
//! The registry owns every subscriber and its bounded delivery queue. The relay
//! pushes deliveries in; each subscriber's session drains them out.
//!
//! # Architecture
//!
//! ```text
//!                      Arc<SubscriptionRegistry>
//!                  ┌──────────────────────────────┐
//!                  │ subscribers: HashMap<Id,     │
//!                  │   SubscriberEntry {          │
//!                  │     tx/rx: mpsc (bounded),   │
//!                  │     filters, cancel,         │
//!                  │   }                          │
//!                  │ >                            │
//!                  └──────────────┬───────────────┘
//!                                 │
//!        Relay::publish ──► enqueue(id) ──► try_send ──► [queue] ──► drain(id) ──► TCP
//!                                              │
//!                                        full: drop newest
//! ```
//!
//! # Backpressure
//!
//! `enqueue` never waits. When a subscriber's queue is full the incoming
//! delivery is dropped and counted; the publisher is never slowed down by a
//! slow subscriber.

pub mod config;
pub mod entry;
pub mod error;
pub mod frame;
pub mod store;

pub use config::RegistryConfig;
pub use entry::{Drained, EnqueueOutcome, SubscriberEntry, SubscriberId, SubscriberStats};
pub use error::RegistryError;
pub use frame::Delivery;
pub use store::SubscriptionRegistry;

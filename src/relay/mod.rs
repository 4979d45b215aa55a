//! Relay core
//!
//! Orchestrates a publish from raw bytes to subscriber queues:
//!
//! ```text
//!   publish(topic, raw)
//!       │
//!       ├─► Codec::decode ──(err)──► PublishError::Decode
//!       │
//!       ├─► latest[publisher_id] = record      (arrival order wins)
//!       │
//!       ├─► TopicRouter::match_topic(topic)
//!       │
//!       └─► SubscriptionRegistry::enqueue(id)  (per match, never blocks)
//! ```

pub mod config;
pub mod core;
pub mod error;

pub use self::config::RelayConfig;
pub use self::core::{LatestPosition, Relay};
pub use self::error::PublishError;

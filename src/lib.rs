//! position-relay: a topic-based relay for position telemetry
//!
//! Publishers send small JSON position records on a topic; subscribers
//! register topic filters and receive every matching record, in order, over
//! a plain line protocol on TCP.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use position_relay::relay::{Relay, RelayConfig};
//! use position_relay::server::{RelayServer, ServerConfig};
//!
//! #[tokio::main]
//! async fn main() -> position_relay::error::Result<()> {
//!     let relay = Arc::new(Relay::with_config(RelayConfig::default()));
//!     let server = RelayServer::new(ServerConfig::default(), relay);
//!     server.run().await
//! }
//! ```
//!
//! # Layers
//!
//! - [`codec`]: position record and its JSON wire format
//! - [`router`]: topics, filters and the subscription trie
//! - [`registry`]: per-subscriber bounded queues
//! - [`relay`]: publish, subscribe and latest-position state
//! - [`protocol`], [`session`], [`server`]: the TCP gateway
//! - [`client`]: publisher, subscriber and drone simulator

pub mod client;
pub mod codec;
pub mod config;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod relay;
pub mod router;
pub mod server;
pub mod session;
pub mod stats;

pub use codec::PositionRecord;
pub use error::{Error, Result};
pub use relay::{Relay, RelayConfig};
pub use router::{Topic, TopicFilter};
pub use server::{RelayServer, ServerConfig};

//! Relay clients
//!
//! Provides client-side access to a relay for:
//! - Publishing positions ([`RelayPublisher`])
//! - Following topics ([`RelaySubscriber`])
//! - Simulating a moving drone ([`Drone`])

pub mod config;
pub mod connector;
pub mod publisher;
pub mod simulator;
pub mod subscriber;

pub use config::ClientConfig;
pub use connector::RelayConnector;
pub use publisher::RelayPublisher;
pub use simulator::Drone;
pub use subscriber::RelaySubscriber;

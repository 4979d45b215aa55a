//! TCP front end of the relay
//!
//! [`RelayServer`] accepts connections and runs one [`Connection`] task per
//! client. All connections share a single [`Relay`](crate::relay::Relay).

pub mod config;
pub mod connection;
pub mod listener;

pub use config::ServerConfig;
pub use connection::Connection;
pub use listener::RelayServer;

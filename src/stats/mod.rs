//! Relay and session statistics

pub mod metrics;

pub use metrics::{PublishReceipt, RelayStats, RelayStatsSnapshot, SessionStats};

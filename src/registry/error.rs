//! Registry error types

use super::entry::SubscriberId;

/// Error type for registry operations
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    /// Subscriber was never connected or has already disconnected
    #[error("unknown subscriber: {0}")]
    UnknownSubscriber(SubscriberId),
}

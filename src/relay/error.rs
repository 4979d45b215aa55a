//! Relay error types

use crate::error::DecodeError;

/// Error returned to a publisher
///
/// Only decode failures reach the publisher; delivery problems on the
/// subscriber side are absorbed by the relay.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PublishError {
    /// Payload was rejected by the codec
    #[error(transparent)]
    Decode(#[from] DecodeError),
}

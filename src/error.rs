//! Error types for the relay
//!
//! Each layer has its own error enum; [`Error`] wraps them for callers that
//! only need to propagate.

use std::io;

use crate::config::ConfigError;
use crate::registry::RegistryError;
use crate::relay::PublishError;

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Socket or file I/O failure
    #[error("io: {0}")]
    Io(#[from] io::Error),

    /// Payload could not be decoded into a position record
    #[error("decode: {0}")]
    Decode(#[from] DecodeError),

    /// Line protocol violation
    #[error("protocol: {0}")]
    Protocol(#[from] ProtocolError),

    /// Relay rejected a publish
    #[error("publish: {0}")]
    Publish(#[from] PublishError),

    /// Subscription registry failure
    #[error("registry: {0}")]
    Registry(#[from] RegistryError),

    /// Configuration could not be loaded
    #[error("config: {0}")]
    Config(#[from] ConfigError),

    /// Remote relay answered a command with `-ERR`
    #[error("rejected by relay: {0}")]
    Rejected(String),

    /// Remote relay closed the connection
    #[error("connection closed")]
    ConnectionClosed,

    /// Operation did not complete in time
    #[error("timed out")]
    Timeout,
}

/// Payload decode failures
///
/// Both variants reject a single message only.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// Not parseable as a JSON object
    #[error("malformed payload: {0}")]
    Malformed(String),

    /// A required field is absent or fails its type/range check
    #[error("invalid field: {0}")]
    InvalidField(&'static str),
}

/// Line protocol failures
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// First word of the line is not a known verb
    #[error("unknown command: {0}")]
    UnknownCommand(String),

    /// Command is missing a required argument
    #[error("missing {0}")]
    MissingArgument(&'static str),

    /// Topic string failed validation
    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    /// Topic filter string failed validation
    #[error("invalid filter: {0}")]
    InvalidFilter(String),

    /// Line exceeded the configured maximum before a newline was seen
    #[error("line too long: {len} bytes (max {max})")]
    LineTooLong { len: usize, max: usize },

    /// Line was not valid UTF-8
    #[error("line is not valid utf-8")]
    InvalidUtf8,

    /// Peer sent bytes the codec could not frame
    #[error("io: {0}")]
    Io(String),
}

impl From<io::Error> for ProtocolError {
    fn from(e: io::Error) -> Self {
        ProtocolError::Io(e.to_string())
    }
}

impl ProtocolError {
    /// Whether the session can keep going after this error
    ///
    /// Framing errors leave the read buffer in an unknown state.
    pub fn is_recoverable(&self) -> bool {
        !matches!(
            self,
            ProtocolError::LineTooLong { .. } | ProtocolError::InvalidUtf8 | ProtocolError::Io(_)
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_error_display() {
        let err = DecodeError::InvalidField("latitude");
        assert_eq!(err.to_string(), "invalid field: latitude");
    }

    #[test]
    fn test_error_from_decode() {
        let err: Error = DecodeError::Malformed("eof".into()).into();
        assert!(matches!(err, Error::Decode(DecodeError::Malformed(_))));
    }

    #[test]
    fn test_protocol_error_recoverable() {
        assert!(ProtocolError::UnknownCommand("FOO".into()).is_recoverable());
        assert!(ProtocolError::MissingArgument("topic").is_recoverable());
        assert!(!ProtocolError::InvalidUtf8.is_recoverable());
        assert!(!ProtocolError::LineTooLong { len: 10, max: 5 }.is_recoverable());
    }
}

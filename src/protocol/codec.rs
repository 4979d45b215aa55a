//! Line framing for `tokio_util::codec`
//!
//! `ServerCodec` sits on the relay side of a connection (reads commands,
//! writes replies); `ClientCodec` is its mirror image.

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};

use super::command::{Command, Reply};
use crate::error::ProtocolError;

/// Default maximum line length in bytes
pub const DEFAULT_MAX_LINE_LENGTH: usize = 64 * 1024;

/// Splits a buffer into newline-terminated lines
#[derive(Debug, Clone)]
struct LineFramer {
    max_length: usize,
    /// Bytes already scanned without finding a newline
    next_index: usize,
}

impl LineFramer {
    fn new(max_length: usize) -> Self {
        Self {
            max_length,
            next_index: 0,
        }
    }

    /// Next complete, non-empty line with `\n` / `\r\n` stripped
    fn next_line(&mut self, src: &mut BytesMut) -> Result<Option<String>, ProtocolError> {
        loop {
            let newline = src[self.next_index..].iter().position(|&b| b == b'\n');

            let Some(offset) = newline else {
                self.next_index = src.len();
                if src.len() > self.max_length {
                    return Err(ProtocolError::LineTooLong {
                        len: src.len(),
                        max: self.max_length,
                    });
                }
                return Ok(None);
            };

            let end = self.next_index + offset;
            self.next_index = 0;

            let mut line = src.split_to(end + 1);
            line.truncate(end);
            if line.last() == Some(&b'\r') {
                line.truncate(end - 1);
            }

            if line.len() > self.max_length {
                return Err(ProtocolError::LineTooLong {
                    len: line.len(),
                    max: self.max_length,
                });
            }
            if line.is_empty() {
                continue;
            }

            return String::from_utf8(line.to_vec())
                .map(Some)
                .map_err(|_| ProtocolError::InvalidUtf8);
        }
    }
}

/// Relay-side codec
///
/// Yields `Ok(Err(..))` for lines that frame correctly but fail to parse, so
/// the connection can answer `-ERR` and keep reading. Framing errors end the
/// stream.
#[derive(Debug, Clone)]
pub struct ServerCodec {
    framer: LineFramer,
}

impl ServerCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            framer: LineFramer::new(max_length),
        }
    }
}

impl Default for ServerCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ServerCodec {
    type Item = Result<Command, ProtocolError>;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        Ok(self
            .framer
            .next_line(src)?
            .map(|line| Command::parse(&line)))
    }
}

impl Encoder<Reply> for ServerCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Reply, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}

/// Client-side codec
#[derive(Debug, Clone)]
pub struct ClientCodec {
    framer: LineFramer,
}

impl ClientCodec {
    /// Create a codec with the default maximum line length
    pub fn new() -> Self {
        Self::with_max_length(DEFAULT_MAX_LINE_LENGTH)
    }

    /// Create a codec with a custom maximum line length
    pub fn with_max_length(max_length: usize) -> Self {
        Self {
            framer: LineFramer::new(max_length),
        }
    }
}

impl Default for ClientCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ClientCodec {
    type Item = Reply;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        match self.framer.next_line(src)? {
            Some(line) => Reply::parse(&line).map(Some),
            None => Ok(None),
        }
    }
}

impl Encoder<Command> for ClientCodec {
    type Error = ProtocolError;

    fn encode(&mut self, item: Command, dst: &mut BytesMut) -> Result<(), Self::Error> {
        item.write_to(dst);
        Ok(())
    }
}

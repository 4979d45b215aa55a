//! Relay line protocol
//!
//! A text protocol with one message per `\n`-terminated line, framed with
//! `tokio_util::codec` so both the relay and the bundled clients can use
//! `Framed` streams.

pub mod codec;
pub mod command;

pub use codec::{ClientCodec, ServerCodec, DEFAULT_MAX_LINE_LENGTH};
pub use command::{Command, Reply};

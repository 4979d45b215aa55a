//! Position record codec
//!
//! Converts between raw publisher payloads and validated [`PositionRecord`]s.
//! Invalid payloads are rejected here and never reach routing or state.

pub mod json;
pub mod record;

pub use json::{decode, encode, Codec};
pub use record::PositionRecord;
pub use crate::error::DecodeError;

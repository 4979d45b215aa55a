//! JSON wire format for position records
//!
//! Wire shape:
//! ```text
//! {"ts": 1531604906, "uuid": "7ebf7ece-...", "name": "drone1",
//!  "latitude": 48.8515, "longitude": 2.2119}
//! ```
//!
//! Unknown fields are ignored. Some drone firmware sends `ts` wrapped in a
//! single-element array (`"ts": [1531604906]`); lenient mode accepts that.

use bytes::Bytes;
use serde_json::{Map, Value};

use super::record::PositionRecord;
use crate::error::DecodeError;

const FIELD_TS: &str = "ts";
const FIELD_UUID: &str = "uuid";
const FIELD_NAME: &str = "name";
const FIELD_LATITUDE: &str = "latitude";
const FIELD_LONGITUDE: &str = "longitude";

/// Position record codec
#[derive(Debug, Clone, Copy)]
pub struct Codec {
    lenient: bool,
}

impl Codec {
    /// Create a codec with default settings (lenient)
    pub fn new() -> Self {
        Self { lenient: true }
    }

    /// Create a codec with explicit lenient mode setting
    pub fn with_lenient(lenient: bool) -> Self {
        Self { lenient }
    }

    /// Whether array-wrapped timestamps are accepted
    pub fn is_lenient(&self) -> bool {
        self.lenient
    }

    /// Decode a raw payload into a validated record
    pub fn decode(&self, raw: &[u8]) -> Result<PositionRecord, DecodeError> {
        let value: Value =
            serde_json::from_slice(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;

        let Value::Object(fields) = value else {
            return Err(DecodeError::Malformed("expected a JSON object".into()));
        };

        let timestamp = self.timestamp(&fields)?;
        let publisher_id = string_field(&fields, FIELD_UUID)?;
        let name = string_field(&fields, FIELD_NAME)?;
        let latitude = number_field(&fields, FIELD_LATITUDE)?;
        let longitude = number_field(&fields, FIELD_LONGITUDE)?;

        PositionRecord::new(timestamp, publisher_id, name, latitude, longitude)
    }

    /// Encode a record into its canonical wire form
    pub fn encode(&self, record: &PositionRecord) -> Bytes {
        let value = serde_json::json!({
            FIELD_TS: record.timestamp(),
            FIELD_UUID: record.publisher_id(),
            FIELD_NAME: record.name(),
            FIELD_LATITUDE: record.latitude(),
            FIELD_LONGITUDE: record.longitude(),
        });

        Bytes::from(value.to_string())
    }

    fn timestamp(&self, fields: &Map<String, Value>) -> Result<u64, DecodeError> {
        match fields.get(FIELD_TS) {
            Some(Value::Number(n)) => n.as_u64().ok_or(DecodeError::InvalidField(FIELD_TS)),
            Some(Value::Array(items)) if self.lenient && items.len() == 1 => items[0]
                .as_u64()
                .ok_or(DecodeError::InvalidField(FIELD_TS)),
            _ => Err(DecodeError::InvalidField(FIELD_TS)),
        }
    }
}

impl Default for Codec {
    fn default() -> Self {
        Self::new()
    }
}

fn string_field<'a>(
    fields: &'a Map<String, Value>,
    name: &'static str,
) -> Result<&'a str, DecodeError> {
    match fields.get(name) {
        Some(Value::String(s)) if !s.is_empty() => Ok(s),
        _ => Err(DecodeError::InvalidField(name)),
    }
}

fn number_field(fields: &Map<String, Value>, name: &'static str) -> Result<f64, DecodeError> {
    fields
        .get(name)
        .and_then(Value::as_f64)
        .ok_or(DecodeError::InvalidField(name))
}

/// Decode with the default codec
pub fn decode(raw: &[u8]) -> Result<PositionRecord, DecodeError> {
    Codec::new().decode(raw)
}

/// Encode with the default codec
pub fn encode(record: &PositionRecord) -> Bytes {
    Codec::new().encode(record)
}

//! Delivery items queued for subscribers

use std::sync::Arc;

use bytes::Bytes;

use crate::codec::PositionRecord;
use crate::router::Topic;

/// A record on its way to one subscriber
///
/// Cheap to clone: the record is shared and `payload` is reference-counted,
/// so fanning out to many subscribers encodes once and copies nothing.
#[derive(Debug, Clone)]
pub struct Delivery {
    /// Topic the record was published on
    pub topic: Topic,
    /// Decoded record
    pub record: Arc<PositionRecord>,
    /// Canonical wire encoding of `record`
    pub payload: Bytes,
}

impl Delivery {
    /// Create a delivery, encoding the record once
    pub fn new(topic: Topic, record: Arc<PositionRecord>) -> Self {
        let payload = crate::codec::encode(&record);
        Self {
            topic,
            record,
            payload,
        }
    }
}

//! Position publisher
//!
//! High-level API for publishing position records to a relay.

use bytes::Bytes;

use super::config::ClientConfig;
use super::connector::{expect_reply, RelayConnector};
use crate::codec::{self, PositionRecord};
use crate::error::Result;
use crate::protocol::{Command, Reply};
use crate::router::Topic;

/// Position publisher
///
/// Every publish waits for the relay's verdict, so a record the relay rejects
/// surfaces as [`Error::Rejected`](crate::error::Error::Rejected).
///
/// # Example
/// ```no_run
/// use position_relay::client::{ClientConfig, RelayPublisher};
/// use position_relay::codec::PositionRecord;
/// use position_relay::router::Topic;
///
/// # async fn example() -> position_relay::error::Result<()> {
/// let mut publisher = RelayPublisher::connect(ClientConfig::new("127.0.0.1:1883")).await?;
///
/// let topic = Topic::new("drone/position")?;
/// let record = PositionRecord::new(1_600_000_000, "d-1", "Alpha", 48.85, 2.21)?;
/// publisher.publish(&topic, &record).await?;
/// # Ok(())
/// # }
/// ```
pub struct RelayPublisher {
    connector: RelayConnector,
    published: u64,
}

impl RelayPublisher {
    /// Connect to the relay
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let connector = RelayConnector::connect(config).await?;
        Ok(Self {
            connector,
            published: 0,
        })
    }

    /// Publish a record on `topic`
    pub async fn publish(&mut self, topic: &Topic, record: &PositionRecord) -> Result<()> {
        self.publish_raw(topic, codec::encode(record)).await
    }

    /// Publish an already encoded payload on `topic`
    ///
    /// The relay validates the payload; a bad one is rejected without
    /// closing the connection.
    pub async fn publish_raw(&mut self, topic: &Topic, payload: Bytes) -> Result<()> {
        let command = Command::Publish {
            topic: topic.clone(),
            payload,
        };
        let reply = self.connector.request(command).await?;
        expect_reply(reply, Reply::Ok)?;

        self.published += 1;
        tracing::trace!(topic = %topic, published = self.published, "Record published");
        Ok(())
    }

    /// Round-trip a `PING`
    pub async fn ping(&mut self) -> Result<()> {
        let reply = self.connector.request(Command::Ping).await?;
        expect_reply(reply, Reply::Pong)
    }

    /// Records accepted by the relay so far
    pub fn published(&self) -> u64 {
        self.published
    }
}

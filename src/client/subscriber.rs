//! Position subscriber

use bytes::Bytes;

use super::config::ClientConfig;
use super::connector::{expect_reply, RelayConnector};
use crate::codec::{Codec, PositionRecord};
use crate::error::Result;
use crate::protocol::{Command, Reply};
use crate::router::{Topic, TopicFilter};

/// Subscriber client
///
/// ```no_run
/// use position_relay::client::{ClientConfig, RelaySubscriber};
/// use position_relay::router::TopicFilter;
///
/// # async fn example() -> position_relay::error::Result<()> {
/// let mut subscriber = RelaySubscriber::connect(ClientConfig::default()).await?;
/// subscriber.subscribe(&TopicFilter::new("drone/#")?).await?;
///
/// while let Some(message) = subscriber.next().await {
///     let (topic, record) = message?;
///     println!("{topic}: {} at {}, {}", record.name(), record.latitude(), record.longitude());
/// }
/// # Ok(())
/// # }
/// ```
pub struct RelaySubscriber {
    connector: RelayConnector,
    codec: Codec,
}

impl RelaySubscriber {
    /// Connect to the relay
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let connector = RelayConnector::connect(config).await?;
        Ok(Self {
            connector,
            codec: Codec::with_lenient(false),
        })
    }

    /// Start receiving records matching `filter`
    pub async fn subscribe(&mut self, filter: &TopicFilter) -> Result<()> {
        let reply = self
            .connector
            .request(Command::Subscribe(filter.clone()))
            .await?;
        expect_reply(reply, Reply::Ok)?;

        tracing::debug!(filter = %filter, "Subscribed");
        Ok(())
    }

    /// Stop receiving records for `filter`
    pub async fn unsubscribe(&mut self, filter: &TopicFilter) -> Result<()> {
        let reply = self
            .connector
            .request(Command::Unsubscribe(filter.clone()))
            .await?;
        expect_reply(reply, Reply::Ok)
    }

    /// Round-trip a `PING`
    pub async fn ping(&mut self) -> Result<()> {
        let reply = self.connector.request(Command::Ping).await?;
        expect_reply(reply, Reply::Pong)
    }

    /// Send a `PING` without waiting for the answer
    ///
    /// Keeps a listen-only connection inside the relay's idle timeout while
    /// [`next`](Self::next) is being polled elsewhere in a loop.
    pub async fn keepalive(&mut self) -> Result<()> {
        self.connector.send(Command::Ping).await
    }

    /// Next record with its topic, as delivered on the wire
    pub async fn next_raw(&mut self) -> Option<Result<(Topic, Bytes)>> {
        self.connector.next_message().await
    }

    /// Next decoded record with its topic
    ///
    /// `None` once the relay closes the connection.
    pub async fn next(&mut self) -> Option<Result<(Topic, PositionRecord)>> {
        let message = self.next_raw().await?;
        Some(message.and_then(|(topic, payload)| {
            let record = self.codec.decode(&payload)?;
            Ok((topic, record))
        }))
    }
}

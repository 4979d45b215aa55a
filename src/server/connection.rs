//! Per-connection handler
//!
//! Reads commands, forwards them to the relay and streams deliveries back to
//! subscribers. Publishing and subscribing may be mixed on one connection.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;
use tokio_util::sync::CancellationToken;

use crate::error::{ProtocolError, Result};
use crate::protocol::{Command, Reply, ServerCodec};
use crate::registry::{Drained, RegistryError, SubscriberId};
use crate::relay::Relay;
use crate::router::{Topic, TopicFilter};
use crate::server::config::ServerConfig;
use crate::session::SessionState;

/// One client connection
pub struct Connection {
    state: SessionState,
    framed: Framed<TcpStream, ServerCodec>,
    config: ServerConfig,
    relay: Arc<Relay>,
    shutdown: CancellationToken,
}

impl Connection {
    /// Create a new connection handler
    pub fn new(
        session_id: u64,
        socket: TcpStream,
        peer_addr: SocketAddr,
        config: ServerConfig,
        relay: Arc<Relay>,
        shutdown: CancellationToken,
    ) -> Self {
        let codec = ServerCodec::with_max_length(config.max_line_length);

        Self {
            state: SessionState::new(session_id, peer_addr),
            framed: Framed::new(socket, codec),
            config,
            relay,
            shutdown,
        }
    }

    /// Run the connection until the peer leaves, it idles out or the server
    /// shuts down
    ///
    /// Subscriber state is released on every exit path.
    pub async fn run(&mut self) -> Result<()> {
        let result = self.serve().await;

        self.state.close();
        if let Some(id) = self.state.finish() {
            if let Err(e) = self.relay.disconnect(id).await {
                tracing::debug!(session_id = self.state.id, error = %e, "Subscriber already gone");
            }
        }

        tracing::debug!(
            session_id = self.state.id,
            peer = %self.state.peer_addr,
            duration = ?self.state.duration(),
            commands = self.state.stats.commands,
            published = self.state.stats.published,
            rejected = self.state.stats.rejected,
            messages_sent = self.state.stats.messages_sent,
            "Session finished"
        );

        result
    }

    async fn serve(&mut self) -> Result<()> {
        loop {
            let idle_left = self
                .config
                .idle_timeout
                .saturating_sub(self.state.idle_for());
            let subscriber = self.state.subscriber;

            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    tracing::debug!(session_id = self.state.id, "Server shutting down");
                    return Ok(());
                }

                frame = self.framed.next() => match frame {
                    None => {
                        tracing::debug!(session_id = self.state.id, "Peer closed connection");
                        return Ok(());
                    }
                    Some(Ok(parsed)) => self.handle_command(parsed).await?,
                    Some(Err(e)) => {
                        tracing::debug!(session_id = self.state.id, error = %e, "Framing error");
                        // Best effort; the stream is unusable after this
                        let _ = self.framed.send(Reply::Err(e.to_string())).await;
                        return Err(e.into());
                    }
                },

                drained = drain_for(&self.relay, subscriber) => match drained {
                    Ok(deliveries) => self.write_deliveries(deliveries).await?,
                    Err(e) => {
                        tracing::warn!(session_id = self.state.id, error = %e, "Subscriber lost");
                        self.state.subscriber = None;
                    }
                },

                _ = tokio::time::sleep(idle_left) => {
                    tracing::debug!(
                        session_id = self.state.id,
                        timeout = ?self.config.idle_timeout,
                        "Idle timeout"
                    );
                    return Ok(());
                }
            }
        }
    }

    async fn handle_command(&mut self, parsed: std::result::Result<Command, ProtocolError>) -> Result<()> {
        self.state.on_command();

        let reply = match parsed {
            Ok(Command::Publish { topic, payload }) => self.handle_publish(&topic, &payload).await,
            Ok(Command::Subscribe(filter)) => self.handle_subscribe(filter).await,
            Ok(Command::Unsubscribe(filter)) => self.handle_unsubscribe(&filter).await,
            Ok(Command::Ping) => Reply::Pong,
            Err(e) => {
                tracing::debug!(session_id = self.state.id, error = %e, "Bad command");
                Reply::Err(e.to_string())
            }
        };

        self.framed.send(reply).await?;
        Ok(())
    }

    async fn handle_publish(&mut self, topic: &Topic, payload: &[u8]) -> Reply {
        match self.relay.publish(topic, payload).await {
            Ok(receipt) => {
                self.state.on_publish(true);
                tracing::trace!(
                    session_id = self.state.id,
                    topic = %topic,
                    matched = receipt.matched,
                    dropped = receipt.dropped,
                    "Published"
                );
                Reply::Ok
            }
            Err(e) => {
                self.state.on_publish(false);
                tracing::debug!(session_id = self.state.id, topic = %topic, error = %e, "Publish rejected");
                Reply::Err(e.to_string())
            }
        }
    }

    async fn handle_subscribe(&mut self, filter: TopicFilter) -> Reply {
        let id = match self.state.subscriber {
            Some(id) => id,
            None => {
                let id = self.relay.connect().await;
                self.state.attach_subscriber(id);
                tracing::debug!(session_id = self.state.id, subscriber = %id, "Session became subscriber");
                id
            }
        };

        match self.relay.subscribe(id, filter).await {
            Ok(_) => Reply::Ok,
            Err(e) => Reply::Err(e.to_string()),
        }
    }

    async fn handle_unsubscribe(&mut self, filter: &TopicFilter) -> Reply {
        let Some(id) = self.state.subscriber else {
            return Reply::Ok;
        };

        match self.relay.unsubscribe(id, filter).await {
            Ok(_) => Reply::Ok,
            Err(e) => Reply::Err(e.to_string()),
        }
    }

    async fn write_deliveries(&mut self, deliveries: Drained) -> Result<()> {
        if deliveries.is_empty() {
            return Ok(());
        }

        for delivery in deliveries {
            let bytes = delivery.topic.as_str().len() + delivery.payload.len() + 6;
            self.framed
                .feed(Reply::Message {
                    topic: delivery.topic,
                    payload: delivery.payload,
                })
                .await?;
            self.state.on_message_sent(bytes);
        }
        self.framed.flush().await?;
        Ok(())
    }
}

/// Wait for deliveries, or forever when the session has not subscribed
async fn drain_for(
    relay: &Relay,
    subscriber: Option<SubscriberId>,
) -> std::result::Result<Drained, RegistryError> {
    match subscriber {
        Some(id) => relay.drain(id).await,
        None => std::future::pending().await,
    }
}

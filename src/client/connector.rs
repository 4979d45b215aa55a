//! Line-protocol connection shared by the publisher and subscriber clients

use std::collections::VecDeque;

use bytes::Bytes;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use super::config::ClientConfig;
use crate::error::{Error, Result};
use crate::protocol::{ClientCodec, Command, Reply};
use crate::router::Topic;

/// Low-level relay connection
///
/// `MSG` lines that arrive while a command is waiting for its reply are
/// buffered and handed out by [`next_message`](Self::next_message) in order.
pub struct RelayConnector {
    framed: Framed<TcpStream, ClientCodec>,
    config: ClientConfig,
    pending: VecDeque<(Topic, Bytes)>,
}

impl RelayConnector {
    /// Connect to the relay
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let stream = tokio::time::timeout(config.connect_timeout, TcpStream::connect(&config.addr))
            .await
            .map_err(|_| Error::Timeout)??;
        stream.set_nodelay(true)?;

        tracing::debug!(addr = %config.addr, "Connected to relay");

        let codec = ClientCodec::with_max_length(config.max_line_length);
        Ok(Self {
            framed: Framed::new(stream, codec),
            config,
            pending: VecDeque::new(),
        })
    }

    /// Send a command and wait for its `+OK`, `-ERR` or `PONG`
    pub async fn request(&mut self, command: Command) -> Result<Reply> {
        self.framed.send(command).await?;

        let timeout = self.config.reply_timeout;
        tokio::time::timeout(timeout, self.await_reply())
            .await
            .map_err(|_| Error::Timeout)?
    }

    /// Send a command without waiting for the reply
    pub async fn send(&mut self, command: Command) -> Result<()> {
        self.framed.send(command).await?;
        Ok(())
    }

    async fn await_reply(&mut self) -> Result<Reply> {
        loop {
            match self.framed.next().await {
                Some(Ok(Reply::Message { topic, payload })) => {
                    self.pending.push_back((topic, payload));
                }
                Some(Ok(reply)) => return Ok(reply),
                Some(Err(e)) => return Err(e.into()),
                None => return Err(Error::ConnectionClosed),
            }
        }
    }

    /// Next delivered message, `None` once the relay closes the connection
    ///
    /// Replies to commands sent with [`send`](Self::send) are skipped.
    pub async fn next_message(&mut self) -> Option<Result<(Topic, Bytes)>> {
        if let Some(message) = self.pending.pop_front() {
            return Some(Ok(message));
        }

        loop {
            match self.framed.next().await? {
                Ok(Reply::Message { topic, payload }) => return Some(Ok((topic, payload))),
                Ok(Reply::Err(reason)) => return Some(Err(Error::Rejected(reason))),
                Ok(reply) => {
                    tracing::trace!(reply = ?reply, "Skipping reply");
                }
                Err(e) => return Some(Err(e.into())),
            }
        }
    }
}

/// Turn a reply into `Ok(())` when it matches `expected`
pub(crate) fn expect_reply(reply: Reply, expected: Reply) -> Result<()> {
    match reply {
        reply if reply == expected => Ok(()),
        Reply::Err(reason) => Err(Error::Rejected(reason)),
        other => Err(Error::Rejected(format!("unexpected reply: {other:?}"))),
    }
}

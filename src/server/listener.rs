//! Relay server listener
//!
//! Handles TCP accept loop and spawns connection handlers.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::Result;
use crate::relay::Relay;
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;

/// Position relay server
pub struct RelayServer {
    config: ServerConfig,
    relay: Arc<Relay>,
    next_session_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
    shutdown: CancellationToken,
}

impl RelayServer {
    /// Create a new server around an existing relay
    pub fn new(config: ServerConfig, relay: Arc<Relay>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            relay,
            next_session_id: AtomicU64::new(1),
            connection_semaphore,
            shutdown: CancellationToken::new(),
        }
    }

    /// Get a reference to the relay
    pub fn relay(&self) -> &Arc<Relay> {
        &self.relay
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        tracing::info!(addr = %listener.local_addr()?, "Position relay listening");
        Ok(listener)
    }

    /// Run the server
    ///
    /// This method blocks until the server is shut down.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve_until(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` resolves
    ///
    /// Open connections are told to close when this returns; each releases
    /// its subscriptions on the way out.
    pub async fn serve_until<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let cleanup_handle = self.relay.spawn_cleanup_task();
        let stats_handle = self.spawn_stats_task();

        let result = tokio::select! {
            _ = shutdown => {
                tracing::info!("Shutdown signal received");
                Ok(())
            }
            result = self.accept_loop(&listener) => result,
        };

        self.shutdown.cancel();
        cleanup_handle.abort();
        stats_handle.abort();

        result
    }

    async fn accept_loop(&self, listener: &TcpListener) -> Result<()> {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    self.handle_connection(socket, peer_addr);
                }
                Err(e) => {
                    tracing::error!(error = %e, "Failed to accept connection");
                }
            }
        }
    }

    fn handle_connection(&self, socket: TcpStream, peer_addr: SocketAddr) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let session_id = self.next_session_id.fetch_add(1, Ordering::Relaxed);

        tracing::debug!(
            session_id = session_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let relay = Arc::clone(&self.relay);
        let shutdown = self.shutdown.child_token();

        tokio::spawn(async move {
            // Held for the lifetime of the connection
            let _permit = permit;

            let mut connection =
                Connection::new(session_id, socket, peer_addr, config, relay, shutdown);

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    session_id = session_id,
                    error = %e,
                    "Connection error"
                );
            }

            tracing::debug!(session_id = session_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }
        Ok(())
    }

    fn spawn_stats_task(&self) -> JoinHandle<()> {
        let relay = Arc::clone(&self.relay);
        let interval = self.config.stats_interval;

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let stats = relay.stats().await;
                tracing::debug!(
                    uptime = ?stats.uptime,
                    published = stats.published,
                    rejected = stats.rejected,
                    delivered = stats.delivered,
                    dropped = stats.dropped,
                    publishers = stats.publishers,
                    subscribers = stats.subscribers,
                    filters = stats.filters,
                    "Relay stats"
                );
            }
        })
    }
}

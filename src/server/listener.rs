//! Relay server listener
//!
//! Handles the TCP accept loop, upgrades connections to WebSocket, and spawns
//! one session task per connection.

use std::future::Future;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{watch, Semaphore};
use tokio::task::{JoinHandle, JoinSet};

use crate::error::{Error, Result};
use crate::registry::{ConnectionId, RoomRegistry};
use crate::server::config::ServerConfig;
use crate::server::connection::Connection;
use crate::stats::RelayStats;

/// Room relay server
pub struct RelayServer {
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    stats: Arc<RelayStats>,
    next_connection_id: AtomicU64,
    connection_semaphore: Option<Arc<Semaphore>>,
}

impl RelayServer {
    /// Create a new server with the given configuration
    pub fn new(config: ServerConfig) -> Self {
        Self::with_registry(config, Arc::new(RoomRegistry::new()))
    }

    /// Create a new server sharing an existing registry
    pub fn with_registry(config: ServerConfig, registry: Arc<RoomRegistry>) -> Self {
        let connection_semaphore = if config.max_connections > 0 {
            Some(Arc::new(Semaphore::new(config.max_connections)))
        } else {
            None
        };

        Self {
            config,
            registry,
            stats: Arc::new(RelayStats::new()),
            next_connection_id: AtomicU64::new(1),
            connection_semaphore,
        }
    }

    /// Get a reference to the room registry
    pub fn registry(&self) -> &Arc<RoomRegistry> {
        &self.registry
    }

    /// Get a reference to the relay statistics
    pub fn stats(&self) -> &Arc<RelayStats> {
        &self.stats
    }

    /// Get the server configuration
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener> {
        let addr = self.config.bind_addr;
        TcpListener::bind(addr)
            .await
            .map_err(|source| Error::Bind { addr, source })
    }

    /// Run the server
    ///
    /// This method blocks until the process is interrupted.
    pub async fn run(&self) -> Result<()> {
        self.run_until(std::future::pending()).await
    }

    /// Run the server with graceful shutdown
    pub async fn run_until<F>(&self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let listener = self.bind().await?;
        self.serve(listener, shutdown).await
    }

    /// Accept connections on an already bound listener until `shutdown`
    /// resolves
    ///
    /// On shutdown the listener is closed, every session is told to stop, and
    /// sessions get `shutdown_grace` to release their rooms before the rest
    /// are aborted.
    pub async fn serve<F>(&self, listener: TcpListener, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        let local_addr = listener.local_addr()?;
        tracing::info!(
            addr = %local_addr,
            public_url = %self.config.public_url(),
            "Relay listening"
        );

        let stats_handle = self.spawn_stats_task();
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let mut sessions = JoinSet::new();

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    tracing::info!("Shutdown signal received");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((socket, peer_addr)) => {
                        self.handle_connection(&mut sessions, socket, peer_addr, shutdown_rx.clone());
                    }
                    Err(e) => {
                        tracing::error!(error = %e, "Failed to accept connection");
                    }
                },
                Some(finished) = sessions.join_next(), if !sessions.is_empty() => {
                    if let Err(e) = finished {
                        if e.is_panic() {
                            tracing::error!(error = %e, "Session task panicked");
                        }
                    }
                }
            }
        }

        drop(listener);
        let _ = shutdown_tx.send(true);
        self.drain(&mut sessions).await;

        if let Some(handle) = stats_handle {
            handle.abort();
        }

        tracing::info!(rooms = self.registry.room_count(), "Relay stopped");
        Ok(())
    }

    async fn drain(&self, sessions: &mut JoinSet<()>) {
        if sessions.is_empty() {
            return;
        }

        tracing::info!(sessions = sessions.len(), "Waiting for sessions to close");

        let drained = tokio::time::timeout(self.config.shutdown_grace, async {
            while sessions.join_next().await.is_some() {}
        })
        .await;

        if drained.is_err() {
            tracing::warn!(
                sessions = sessions.len(),
                "Shutdown grace period elapsed, aborting sessions"
            );
            // Aborting drops each session, which releases its room
            sessions.shutdown().await;
        }
    }

    fn handle_connection(
        &self,
        sessions: &mut JoinSet<()>,
        socket: TcpStream,
        peer_addr: SocketAddr,
        shutdown: watch::Receiver<bool>,
    ) {
        // Check connection limit
        let permit = if let Some(ref sem) = self.connection_semaphore {
            match sem.clone().try_acquire_owned() {
                Ok(permit) => Some(permit),
                Err(_) => {
                    self.stats.connection_rejected();
                    tracing::warn!(peer = %peer_addr, "Connection rejected: limit reached");
                    return;
                }
            }
        } else {
            None
        };

        let connection_id = ConnectionId::new(self.next_connection_id.fetch_add(1, Ordering::Relaxed));

        tracing::debug!(
            connection_id = %connection_id,
            peer = %peer_addr,
            "New connection"
        );

        if let Err(e) = self.configure_socket(&socket) {
            tracing::error!(error = %e, "Failed to configure socket");
            return;
        }

        let config = self.config.clone();
        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        sessions.spawn(async move {
            let _permit = permit;

            let handshake = tokio::time::timeout(
                config.handshake_timeout,
                tokio_tungstenite::accept_async(socket),
            )
            .await;

            let ws = match handshake {
                Ok(Ok(ws)) => ws,
                Ok(Err(e)) => {
                    tracing::debug!(connection_id = %connection_id, error = %e, "WebSocket handshake failed");
                    return;
                }
                Err(_) => {
                    tracing::debug!(connection_id = %connection_id, "WebSocket handshake timed out");
                    return;
                }
            };

            stats.connection_opened();

            let connection = Connection::new(
                connection_id,
                peer_addr,
                ws,
                config,
                registry,
                Arc::clone(&stats),
                shutdown,
            );

            if let Err(e) = connection.run().await {
                tracing::debug!(
                    connection_id = %connection_id,
                    error = %e,
                    "Connection error"
                );
            }

            stats.connection_closed();
            tracing::debug!(connection_id = %connection_id, "Connection closed");
        });
    }

    fn configure_socket(&self, socket: &TcpStream) -> std::io::Result<()> {
        if self.config.tcp_nodelay {
            socket.set_nodelay(true)?;
        }

        Ok(())
    }

    fn spawn_stats_task(&self) -> Option<JoinHandle<()>> {
        let interval = self.config.stats_interval;
        if interval.is_zero() {
            return None;
        }

        let registry = Arc::clone(&self.registry);
        let stats = Arc::clone(&self.stats);

        Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick fires immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let snapshot = stats.snapshot();
                tracing::info!(
                    rooms = registry.room_count(),
                    connections = snapshot.connections_active,
                    relayed = snapshot.messages_relayed,
                    deliveries = snapshot.deliveries,
                    evictions = snapshot.evictions,
                    dropped = snapshot.malformed_dropped + snapshot.unjoined_dropped,
                    "Relay stats"
                );
            }
        }))
    }

    /// Get the configured bind address
    pub fn bind_addr(&self) -> SocketAddr {
        self.config.bind_addr
    }
}

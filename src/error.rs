//! Error types for the relay
//!
//! Registry operations never fail; errors only arise at the transport edge
//! (binding, WebSocket I/O) and in the client.

use std::net::SocketAddr;
use std::time::Duration;

use tokio_tungstenite::tungstenite;

/// Result alias used throughout the crate
pub type Result<T> = std::result::Result<T, Error>;

/// Crate-wide error type
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The listening socket could not be bound
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        #[source]
        source: std::io::Error,
    },

    /// Socket-level I/O failure
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// WebSocket protocol or transport failure
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] tungstenite::Error),

    /// JSON encoding failure
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The relay did not acknowledge a join in time
    #[error("no join acknowledgement within {0:?}")]
    JoinTimeout(Duration),

    /// The relay answered a join with something other than the matching ack
    #[error("unexpected reply to join: {0}")]
    UnexpectedReply(String),

    /// The connection closed before the operation completed
    #[error("connection closed")]
    ConnectionClosed,
}

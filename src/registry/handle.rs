//! Connection handles held by rooms
//!
//! A handle is the registry's non-owning view of a live connection: an id plus
//! a sender into the connection's outbound queue. The owning session's writer
//! task drains that queue; once it stops, every delivery attempt fails and the
//! handle is considered non-viable.

use tokio::sync::mpsc;

use super::frame::Payload;

/// Unique identifier for a connection within one server process
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Create a connection id
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Numeric value of the id
    pub fn get(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Delivery to a handle failed because its connection is gone
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("connection {0} is no longer accepting messages")]
pub struct Undeliverable(pub ConnectionId);

/// Handle to a connection's outbound queue
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
    outbound: mpsc::Sender<Payload>,
}

impl ConnectionHandle {
    /// Wrap an existing outbound sender
    pub fn new(id: ConnectionId, outbound: mpsc::Sender<Payload>) -> Self {
        Self { id, outbound }
    }

    /// Create a handle together with the receiving end of its outbound queue
    pub fn channel(id: ConnectionId, capacity: usize) -> (Self, mpsc::Receiver<Payload>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (Self::new(id, tx), rx)
    }

    /// Connection id
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// Whether the receiving side has gone away
    pub fn is_closed(&self) -> bool {
        self.outbound.is_closed()
    }

    /// Queue a payload for this connection
    ///
    /// Waits for queue capacity if the connection's writer is behind. Fails
    /// only when the connection can no longer receive anything.
    pub async fn deliver(&self, payload: Payload) -> Result<(), Undeliverable> {
        if self.outbound.is_closed() {
            return Err(Undeliverable(self.id));
        }

        self.outbound
            .send(payload)
            .await
            .map_err(|_| Undeliverable(self.id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_deliver_to_open_handle() {
        let (handle, mut rx) = ConnectionHandle::channel(ConnectionId::new(1), 4);

        handle.deliver(Payload::text("hi")).await.unwrap();

        assert_eq!(rx.recv().await, Some(Payload::text("hi")));
        assert!(!handle.is_closed());
    }

    #[tokio::test]
    async fn test_deliver_to_closed_handle_fails() {
        let (handle, rx) = ConnectionHandle::channel(ConnectionId::new(7), 4);
        drop(rx);

        assert!(handle.is_closed());
        let err = handle.deliver(Payload::text("hi")).await.unwrap_err();
        assert_eq!(err, Undeliverable(ConnectionId::new(7)));
    }

    #[test]
    fn test_zero_capacity_is_clamped() {
        let (handle, _rx) = ConnectionHandle::channel(ConnectionId::new(1), 0);
        assert_eq!(handle.id().get(), 1);
    }
}

//! WebSocket connection driver
//!
//! Splits an accepted WebSocket into a read loop, which feeds the session, and
//! a writer task, which is the only thing that writes to the socket. The
//! writer drains the connection's outbound queue; when the socket fails it
//! stops, the queue closes, and other sessions' broadcasts start seeing this
//! connection as non-viable.

use std::net::SocketAddr;
use std::sync::Arc;

use futures::stream::{SplitSink, StreamExt};
use futures::SinkExt;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, watch};
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::WebSocketStream;

use crate::error::Result;
use crate::registry::{ConnectionHandle, ConnectionId, Payload, RoomRegistry};
use crate::server::config::ServerConfig;
use crate::session::{Session, SessionState};
use crate::stats::RelayStats;

/// One accepted relay connection
pub(crate) struct Connection<S> {
    id: ConnectionId,
    peer_addr: SocketAddr,
    ws: WebSocketStream<S>,
    config: ServerConfig,
    registry: Arc<RoomRegistry>,
    stats: Arc<RelayStats>,
    shutdown: watch::Receiver<bool>,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    pub(crate) fn new(
        id: ConnectionId,
        peer_addr: SocketAddr,
        ws: WebSocketStream<S>,
        config: ServerConfig,
        registry: Arc<RoomRegistry>,
        stats: Arc<RelayStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        Self {
            id,
            peer_addr,
            ws,
            config,
            registry,
            stats,
            shutdown,
        }
    }

    /// Drive the connection until the peer closes, the transport fails, or the
    /// server shuts down
    ///
    /// The session's room membership is released before this returns, on
    /// every path.
    pub(crate) async fn run(self) -> Result<()> {
        let Connection {
            id,
            peer_addr,
            ws,
            config,
            registry,
            stats,
            mut shutdown,
        } = self;

        let (sink, mut stream) = ws.split();
        let (handle, outbound) = ConnectionHandle::channel(id, config.outbound_queue_capacity);
        let writer = tokio::spawn(write_loop(id, sink, outbound));

        let mut session = Session::new(SessionState::new(id, peer_addr), handle, registry, stats);

        let result = if *shutdown.borrow_and_update() {
            Ok(())
        } else {
            loop {
                let frame = tokio::select! {
                    _ = shutdown.changed() => {
                        tracing::debug!(connection_id = %id, "Closing for shutdown");
                        break Ok(());
                    }
                    frame = stream.next() => frame,
                };

                match frame {
                    Some(Ok(Message::Text(text))) => {
                        session.on_message(Payload::text(text.as_str())).await;
                    }
                    Some(Ok(Message::Binary(data))) => {
                        session.on_message(Payload::Binary(data)).await;
                    }
                    Some(Ok(Message::Close(_))) | None => break Ok(()),
                    // Ping/pong are answered by tungstenite
                    Some(Ok(_)) => {}
                    Some(Err(e)) => break Err(e.into()),
                }
            }
        };

        // Leaves the room and drops our own sender; the writer then finishes
        // once in-flight broadcasts release their clones.
        session.close();

        if let Err(e) = writer.await {
            tracing::warn!(connection_id = %id, error = %e, "Writer task failed");
        }

        result
    }
}

async fn write_loop<S>(
    id: ConnectionId,
    mut sink: SplitSink<WebSocketStream<S>, Message>,
    mut outbound: mpsc::Receiver<Payload>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
{
    while let Some(payload) = outbound.recv().await {
        if let Err(e) = sink.send(into_message(payload)).await {
            tracing::debug!(connection_id = %id, error = %e, "Write failed");
            return;
        }
    }

    // Peer may already be gone
    let _ = sink.close().await;
}

fn into_message(payload: Payload) -> Message {
    match payload {
        Payload::Text(text) => Message::Text(text.to_string().into()),
        Payload::Binary(data) => Message::Binary(data),
    }
}

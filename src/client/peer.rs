//! Relay room peer
//!
//! High-level API for joining a relay room and exchanging messages with the
//! other members.

use std::collections::VecDeque;

use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use serde::Serialize;
use tokio::net::TcpStream;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

use crate::error::{Error, Result};
use crate::protocol::ControlMessage;
use crate::registry::{InviteToken, Payload};

use super::config::ClientConfig;

type RelayStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Events from the relay
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PeerEvent {
    /// A message relayed from another room member
    Message(Payload),

    /// The relay connection closed
    Closed,
}

/// A member of a relay room
///
/// # Example
/// ```no_run
/// use room_relay::client::{ClientConfig, PeerEvent, RelayPeer};
///
/// # async fn example() -> room_relay::Result<()> {
/// let config = ClientConfig::new("ws://localhost:8787", "abc123");
/// let mut peer = RelayPeer::connect(config).await?;
///
/// peer.send_text(r#""hello""#).await?;
///
/// while let Some(PeerEvent::Message(payload)) = peer.recv().await {
///     println!("received {} bytes", payload.len());
/// }
/// # Ok(())
/// # }
/// ```
pub struct RelayPeer {
    invite: InviteToken,
    sink: SplitSink<RelayStream, Message>,
    events: mpsc::Receiver<PeerEvent>,
    /// Messages that arrived before the join ack
    pending: VecDeque<Payload>,
    reader: JoinHandle<()>,
}

impl RelayPeer {
    /// Connect to the relay and join the configured room.
    ///
    /// Returns once the relay has acknowledged the join.
    pub async fn connect(config: ClientConfig) -> Result<Self> {
        let (ws, _response) = tokio_tungstenite::connect_async(config.url.as_str()).await?;
        let (mut sink, mut stream) = ws.split();

        let join = serde_json::to_string(&ControlMessage::join(&config.invite))?;
        sink.send(Message::Text(join.into())).await?;

        let pending = tokio::time::timeout(
            config.join_timeout,
            wait_for_ack(&mut stream, &config.invite),
        )
        .await
        .map_err(|_| Error::JoinTimeout(config.join_timeout))??;

        tracing::debug!(invite = %config.invite, url = %config.url, "Joined relay room");

        let (tx, rx) = mpsc::channel(config.event_buffer);
        let reader = tokio::spawn(read_loop(stream, tx));

        Ok(Self {
            invite: config.invite,
            sink,
            events: rx,
            pending,
            reader,
        })
    }

    /// Room this peer joined
    pub fn invite(&self) -> &InviteToken {
        &self.invite
    }

    /// Send a text frame to the room
    pub async fn send_text(&mut self, text: impl Into<String>) -> Result<()> {
        let text: String = text.into();
        self.sink.send(Message::Text(text.into())).await?;
        Ok(())
    }

    /// Serialize a value and send it to the room
    pub async fn send_json<T: Serialize + ?Sized>(&mut self, value: &T) -> Result<()> {
        let text = serde_json::to_string(value)?;
        self.send_text(text).await
    }

    /// Send a binary frame to the room
    pub async fn send_binary(&mut self, data: impl Into<Bytes>) -> Result<()> {
        self.sink.send(Message::Binary(data.into())).await?;
        Ok(())
    }

    /// Wait for the next event
    ///
    /// Returns `None` after `PeerEvent::Closed` has been delivered.
    pub async fn recv(&mut self) -> Option<PeerEvent> {
        if let Some(payload) = self.pending.pop_front() {
            return Some(PeerEvent::Message(payload));
        }
        self.events.recv().await
    }

    /// Close the connection, leaving the room
    pub async fn close(mut self) -> Result<()> {
        self.sink.close().await?;
        Ok(())
    }
}

impl Drop for RelayPeer {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Read frames until the join ack arrives, keeping anything relayed earlier
async fn wait_for_ack(
    stream: &mut SplitStream<RelayStream>,
    invite: &InviteToken,
) -> Result<VecDeque<Payload>> {
    let mut early = VecDeque::new();

    while let Some(frame) = stream.next().await {
        match frame? {
            Message::Text(text) => {
                match serde_json::from_str::<ControlMessage>(text.as_str()) {
                    Ok(ControlMessage::Joined { invite: acked }) if acked == invite.as_str() => {
                        return Ok(early);
                    }
                    Ok(ControlMessage::Joined { invite: acked }) => {
                        return Err(Error::UnexpectedReply(acked));
                    }
                    _ => early.push_back(Payload::text(text.as_str())),
                }
            }
            Message::Binary(data) => early.push_back(Payload::Binary(data)),
            Message::Close(_) => return Err(Error::ConnectionClosed),
            _ => {}
        }
    }

    Err(Error::ConnectionClosed)
}

async fn read_loop(mut stream: SplitStream<RelayStream>, events: mpsc::Sender<PeerEvent>) {
    while let Some(frame) = stream.next().await {
        let payload = match frame {
            Ok(Message::Text(text)) => Payload::text(text.as_str()),
            Ok(Message::Binary(data)) => Payload::Binary(data),
            Ok(Message::Close(_)) => break,
            Ok(_) => continue,
            Err(e) => {
                tracing::debug!(error = %e, "Relay connection error");
                break;
            }
        };

        if events.send(PeerEvent::Message(payload)).await.is_err() {
            return;
        }
    }

    let _ = events.send(PeerEvent::Closed).await;
}

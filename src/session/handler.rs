//! Per-connection message dispatch
//!
//! [`Session`] is transport-agnostic: it receives inbound payloads one at a
//! time and either joins a room or relays into it. Outbound traffic for the
//! connection (the join ack and everything relayed by other members) goes
//! through the connection's own [`ConnectionHandle`], whose queue is drained
//! by a single writer.

use std::sync::Arc;

use crate::protocol::{classify, ControlMessage, Inbound};
use crate::registry::{
    ConnectionHandle, Fanout, InviteToken, Membership, Payload, RoomRegistry, RoomState,
};
use crate::stats::RelayStats;

use super::state::SessionState;

/// What happened to one inbound message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Disposition {
    /// The session joined a room and was sent an ack
    Joined(RoomState),
    /// A join arrived after the session had already joined; ignored
    DuplicateJoin,
    /// A join without a usable invite; ignored
    InvalidJoin,
    /// Forwarded to the other members of the session's room
    Relayed(Fanout),
    /// Non-join message before any join; dropped
    Unjoined,
    /// Not JSON; dropped
    Malformed,
}

/// Relay session for one connection
pub struct Session {
    state: SessionState,
    handle: ConnectionHandle,
    registry: Arc<RoomRegistry>,
    stats: Arc<RelayStats>,
    membership: Option<Membership>,
}

impl Session {
    /// Create a session for a connection
    pub fn new(
        state: SessionState,
        handle: ConnectionHandle,
        registry: Arc<RoomRegistry>,
        stats: Arc<RelayStats>,
    ) -> Self {
        Self {
            state,
            handle,
            registry,
            stats,
            membership: None,
        }
    }

    /// Session state
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Handle one inbound message
    pub async fn on_message(&mut self, payload: Payload) -> Disposition {
        self.state.messages_received += 1;

        match classify(payload.as_bytes()) {
            Inbound::Join(invite) => self.join(invite).await,
            Inbound::InvalidJoin => {
                tracing::debug!(
                    connection_id = %self.state.id,
                    "Ignoring join without invite"
                );
                Disposition::InvalidJoin
            }
            Inbound::Relay => self.relay(payload).await,
            Inbound::Malformed => {
                self.stats.malformed();
                tracing::debug!(
                    connection_id = %self.state.id,
                    size = payload.len(),
                    "Dropping malformed message"
                );
                Disposition::Malformed
            }
        }
    }

    async fn join(&mut self, invite: InviteToken) -> Disposition {
        if self.state.is_joined() {
            self.stats.duplicate_join();
            tracing::debug!(
                connection_id = %self.state.id,
                joined = ?self.state.invite(),
                requested = %invite,
                "Ignoring duplicate join"
            );
            return Disposition::DuplicateJoin;
        }

        let (membership, room) = self.registry.enter(invite.clone(), self.handle.clone());
        self.membership = Some(membership);
        self.state.on_join(invite.clone());
        self.stats.joined();

        tracing::debug!(
            connection_id = %self.state.id,
            invite = %invite,
            members = room.members,
            "Session joined room"
        );

        match ControlMessage::joined(&invite).to_payload() {
            Ok(ack) => {
                if self.handle.deliver(ack).await.is_err() {
                    tracing::debug!(
                        connection_id = %self.state.id,
                        "Join ack undeliverable, connection closing"
                    );
                }
            }
            Err(e) => {
                tracing::warn!(error = %e, "Failed to encode join ack");
            }
        }

        Disposition::Joined(room)
    }

    async fn relay(&mut self, payload: Payload) -> Disposition {
        let Some(invite) = self.state.invite().cloned() else {
            self.stats.unjoined();
            tracing::debug!(
                connection_id = %self.state.id,
                "Dropping message from unjoined session"
            );
            return Disposition::Unjoined;
        };

        let fanout = self
            .registry
            .broadcast(&invite, self.state.id, payload)
            .await;

        self.state.messages_relayed += 1;
        self.stats.relayed(fanout.delivered, fanout.evicted);

        Disposition::Relayed(fanout)
    }

    /// End the session, leaving its room
    ///
    /// Dropping a `Session` without calling this releases the room as well;
    /// `close` only makes the ordering explicit and returns the final state.
    pub fn close(mut self) -> SessionState {
        self.state.close();
        drop(self.membership.take());

        tracing::debug!(
            connection_id = %self.state.id,
            peer = %self.state.peer_addr,
            duration_ms = self.state.duration().as_millis() as u64,
            received = self.state.messages_received,
            relayed = self.state.messages_relayed,
            "Session closed"
        );

        self.state
    }
}

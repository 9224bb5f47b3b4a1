//! Scoped room membership
//!
//! A [`Membership`] is returned when a session joins a room. Dropping it
//! removes the connection from the room, so every exit path of a session
//! (normal close, transport error, shutdown, task abort, panic unwinding)
//! releases the membership exactly once.

use std::sync::Arc;

use super::frame::InviteToken;
use super::handle::ConnectionId;
use super::store::RoomRegistry;

/// Guard for one connection's membership in one room
pub struct Membership {
    registry: Arc<RoomRegistry>,
    invite: InviteToken,
    connection_id: ConnectionId,
}

impl Membership {
    pub(super) fn new(
        registry: Arc<RoomRegistry>,
        invite: InviteToken,
        connection_id: ConnectionId,
    ) -> Self {
        Self {
            registry,
            invite,
            connection_id,
        }
    }

    /// Room this membership belongs to
    pub fn invite(&self) -> &InviteToken {
        &self.invite
    }

    /// Connection holding the membership
    pub fn connection_id(&self) -> ConnectionId {
        self.connection_id
    }
}

impl std::fmt::Debug for Membership {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Membership")
            .field("invite", &self.invite)
            .field("connection_id", &self.connection_id)
            .finish()
    }
}

impl Drop for Membership {
    fn drop(&mut self) {
        // May already be gone if a broadcast evicted us first
        let removed = self.registry.leave(&self.invite, self.connection_id);

        tracing::debug!(
            invite = %self.invite,
            connection_id = %self.connection_id,
            removed,
            "Membership released"
        );
    }
}

//! Room registry implementation
//!
//! The central registry that tracks room membership and fans payloads out to
//! members.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};

use super::entry::{Fanout, Room, RoomState, RoomStats};
use super::frame::{InviteToken, Payload};
use super::handle::{ConnectionHandle, ConnectionId};
use super::membership::Membership;

/// Central registry for all active rooms
///
/// The outer map is behind a `RwLock`; each room has its own `Mutex`.
/// Joins and broadcasts only take the map's read lock, so activity in one room
/// does not contend with another. Leaves take the write lock so that removing
/// the last member and dropping the room happen atomically with respect to
/// concurrent joins. No lock is ever held across an `.await`.
pub struct RoomRegistry {
    /// Map of invite token to room membership
    rooms: RwLock<HashMap<InviteToken, Arc<Mutex<Room>>>>,
}

impl RoomRegistry {
    /// Create an empty registry
    pub fn new() -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
        }
    }

    /// Add a connection to a room, creating the room if needed
    ///
    /// Idempotent: joining twice with the same connection id leaves a single
    /// membership edge. Never fails.
    pub fn join(&self, invite: &InviteToken, handle: ConnectionHandle) -> RoomState {
        let connection_id = handle.id();

        {
            let rooms = self.rooms.read();
            if let Some(room) = rooms.get(invite) {
                let mut room = room.lock();
                let newly_joined = room.insert(handle);

                tracing::debug!(
                    invite = %invite,
                    connection_id = %connection_id,
                    members = room.len(),
                    "Member joined room"
                );

                return RoomState {
                    members: room.len(),
                    created: false,
                    newly_joined,
                };
            }
        }

        let mut rooms = self.rooms.write();
        let mut created = false;
        let room = rooms.entry(invite.clone()).or_insert_with(|| {
            created = true;
            Arc::new(Mutex::new(Room::new()))
        });

        let mut room = room.lock();
        let newly_joined = room.insert(handle);

        if created {
            tracing::info!(
                invite = %invite,
                connection_id = %connection_id,
                "Room created"
            );
        } else {
            tracing::debug!(
                invite = %invite,
                connection_id = %connection_id,
                members = room.len(),
                "Member joined room"
            );
        }

        RoomState {
            members: room.len(),
            created,
            newly_joined,
        }
    }

    /// Join a room and return a guard that leaves it when dropped
    pub fn enter(
        self: &Arc<Self>,
        invite: InviteToken,
        handle: ConnectionHandle,
    ) -> (Membership, RoomState) {
        let connection_id = handle.id();
        let state = self.join(&invite, handle);
        let membership = Membership::new(Arc::clone(self), invite, connection_id);
        (membership, state)
    }

    /// Remove a connection from a room
    ///
    /// Removes the room itself once it is empty. Returns whether the
    /// connection was a member; stale combinations are a no-op.
    pub fn leave(&self, invite: &InviteToken, connection_id: ConnectionId) -> bool {
        let mut rooms = self.rooms.write();

        let Some(room) = rooms.get(invite) else {
            return false;
        };

        let (removed, remaining) = {
            let mut room = room.lock();
            let removed = room.remove(connection_id);
            (removed, room.len())
        };

        if remaining == 0 {
            rooms.remove(invite);
            tracing::info!(invite = %invite, "Room removed (empty)");
        } else if removed {
            tracing::debug!(
                invite = %invite,
                connection_id = %connection_id,
                members = remaining,
                "Member left room"
            );
        }

        removed
    }

    /// Deliver a payload to every member of a room except the sender
    ///
    /// Members whose connection is gone are skipped and removed from the room
    /// after the pass. A missing room delivers nothing.
    pub async fn broadcast(
        &self,
        invite: &InviteToken,
        sender: ConnectionId,
        payload: Payload,
    ) -> Fanout {
        let recipients = {
            let rooms = self.rooms.read();
            match rooms.get(invite) {
                Some(room) => room.lock().recipients(sender),
                None => return Fanout::default(),
            }
        };

        let mut fanout = Fanout::default();
        let mut stale = Vec::new();

        for member in recipients {
            match member.deliver(payload.clone()).await {
                Ok(()) => fanout.delivered += 1,
                Err(_) => stale.push(member.id()),
            }
        }

        for connection_id in stale {
            if self.leave(invite, connection_id) {
                fanout.evicted += 1;
                tracing::debug!(
                    invite = %invite,
                    connection_id = %connection_id,
                    "Evicted stale member"
                );
            }
        }

        tracing::trace!(
            invite = %invite,
            sender = %sender,
            delivered = fanout.delivered,
            evicted = fanout.evicted,
            "Broadcast complete"
        );

        fanout
    }

    /// Check if a room exists
    pub fn room_exists(&self, invite: &InviteToken) -> bool {
        self.rooms.read().contains_key(invite)
    }

    /// Check if a connection is a member of a room
    pub fn contains(&self, invite: &InviteToken, connection_id: ConnectionId) -> bool {
        self.rooms
            .read()
            .get(invite)
            .is_some_and(|room| room.lock().contains(connection_id))
    }

    /// Number of members in a room (0 if the room does not exist)
    pub fn member_count(&self, invite: &InviteToken) -> usize {
        self.rooms
            .read()
            .get(invite)
            .map_or(0, |room| room.lock().len())
    }

    /// Get room statistics
    pub fn room_stats(&self, invite: &InviteToken) -> Option<RoomStats> {
        let rooms = self.rooms.read();
        let room = rooms.get(invite)?.lock();

        Some(RoomStats {
            invite: invite.clone(),
            members: room.len(),
            age: room.created_at.elapsed(),
        })
    }

    /// Statistics for every room
    pub fn rooms(&self) -> Vec<RoomStats> {
        self.rooms
            .read()
            .iter()
            .map(|(invite, room)| {
                let room = room.lock();
                RoomStats {
                    invite: invite.clone(),
                    members: room.len(),
                    age: room.created_at.elapsed(),
                }
            })
            .collect()
    }

    /// Get total number of rooms
    pub fn room_count(&self) -> usize {
        self.rooms.read().len()
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use tokio::sync::mpsc;

    use super::*;

    fn member(id: u64) -> (ConnectionHandle, mpsc::Receiver<Payload>) {
        ConnectionHandle::channel(ConnectionId::new(id), 16)
    }

    #[test]
    fn test_join_creates_room() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("abc123");
        let (a, _rx) = member(1);

        let state = registry.join(&invite, a);

        assert!(state.created);
        assert!(state.newly_joined);
        assert_eq!(state.members, 1);
        assert!(registry.room_exists(&invite));
        assert_eq!(registry.room_count(), 1);
    }

    #[test]
    fn test_join_is_idempotent() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("abc123");
        let (a, _rx) = member(1);

        registry.join(&invite, a.clone());
        let state = registry.join(&invite, a);

        assert!(!state.created);
        assert!(!state.newly_joined);
        assert_eq!(registry.member_count(&invite), 1);
    }

    #[test]
    fn test_join_accepts_empty_token() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("");
        let (a, _rx) = member(1);

        let state = registry.join(&invite, a);

        assert!(state.created);
        assert!(registry.room_exists(&invite));
    }

    #[tokio::test]
    async fn test_broadcast_excludes_sender() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, mut rx_a) = member(1);
        let (b, mut rx_b) = member(2);
        let (c, mut rx_c) = member(3);
        registry.join(&invite, a);
        registry.join(&invite, b);
        registry.join(&invite, c);

        let fanout = registry
            .broadcast(&invite, ConnectionId::new(1), Payload::text("hello"))
            .await;

        assert_eq!(fanout.delivered, 2);
        assert_eq!(fanout.evicted, 0);
        assert_eq!(rx_b.recv().await, Some(Payload::text("hello")));
        assert_eq!(rx_c.recv().await, Some(Payload::text("hello")));
        assert!(rx_a.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_broadcast_to_missing_room_is_noop() {
        let registry = RoomRegistry::new();

        let fanout = registry
            .broadcast(
                &InviteToken::from("nowhere"),
                ConnectionId::new(1),
                Payload::text("x"),
            )
            .await;

        assert_eq!(fanout, Fanout::default());
        assert_eq!(registry.room_count(), 0);
    }

    #[tokio::test]
    async fn test_broadcast_evicts_stale_member() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, rx_b) = member(2);
        let (c, mut rx_c) = member(3);
        registry.join(&invite, a);
        registry.join(&invite, b);
        registry.join(&invite, c);

        // Connection 2 vanishes without leaving
        drop(rx_b);

        let fanout = registry
            .broadcast(&invite, ConnectionId::new(1), Payload::text("ping"))
            .await;

        assert_eq!(fanout.delivered, 1);
        assert_eq!(fanout.evicted, 1);
        assert_eq!(rx_c.recv().await, Some(Payload::text("ping")));
        assert!(!registry.contains(&invite, ConnectionId::new(2)));
        assert_eq!(registry.member_count(&invite), 2);
    }

    #[tokio::test]
    async fn test_eviction_of_last_other_member_keeps_sender_room() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, rx_b) = member(2);
        registry.join(&invite, a);
        registry.join(&invite, b);
        drop(rx_b);

        let fanout = registry
            .broadcast(&invite, ConnectionId::new(1), Payload::text("ping"))
            .await;

        assert_eq!(fanout.delivered, 0);
        assert_eq!(fanout.evicted, 1);
        assert_eq!(registry.member_count(&invite), 1);
    }

    #[tokio::test]
    async fn test_eviction_can_remove_room() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (b, rx_b) = member(2);
        registry.join(&invite, b);
        drop(rx_b);

        // Sender is not a member; the only member is stale
        let fanout = registry
            .broadcast(&invite, ConnectionId::new(1), Payload::text("ping"))
            .await;

        assert_eq!(fanout.evicted, 1);
        assert!(!registry.room_exists(&invite));
    }

    #[test]
    fn test_leave_removes_empty_room() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        registry.join(&invite, a);
        registry.join(&invite, b);

        assert!(registry.leave(&invite, ConnectionId::new(1)));
        assert!(registry.room_exists(&invite));

        assert!(registry.leave(&invite, ConnectionId::new(2)));
        assert!(!registry.room_exists(&invite));
        assert!(registry.room_stats(&invite).is_none());
        assert_eq!(registry.room_count(), 0);
    }

    #[test]
    fn test_leave_is_idempotent() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        registry.join(&invite, a);
        registry.join(&invite, b);

        assert!(registry.leave(&invite, ConnectionId::new(1)));
        assert!(!registry.leave(&invite, ConnectionId::new(1)));
        assert!(!registry.leave(&InviteToken::from("other"), ConnectionId::new(2)));
        assert_eq!(registry.member_count(&invite), 1);
    }

    #[tokio::test]
    async fn test_rejoin_after_gc_is_fresh_room() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, _rx_b) = member(2);
        registry.join(&invite, a);
        registry.join(&invite, b);
        registry.leave(&invite, ConnectionId::new(1));
        registry.leave(&invite, ConnectionId::new(2));

        let (c, _rx_c) = member(3);
        let state = registry.join(&invite, c);

        assert!(state.created);
        assert_eq!(state.members, 1);
        assert!(!registry.contains(&invite, ConnectionId::new(1)));

        let fanout = registry
            .broadcast(&invite, ConnectionId::new(3), Payload::text("x"))
            .await;
        assert_eq!(fanout.delivered, 0);
    }

    #[tokio::test]
    async fn test_broadcast_preserves_sender_order() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, mut rx_b) = member(2);
        registry.join(&invite, a);
        registry.join(&invite, b);

        for i in 0..10 {
            registry
                .broadcast(&invite, ConnectionId::new(1), Payload::text(format!("m{i}")))
                .await;
        }

        for i in 0..10 {
            assert_eq!(rx_b.recv().await, Some(Payload::text(format!("m{i}"))));
        }
    }

    #[tokio::test]
    async fn test_broadcast_waits_for_slow_member() {
        let registry = Arc::new(RoomRegistry::new());
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        let (b, mut rx_b) = ConnectionHandle::channel(ConnectionId::new(2), 1);
        registry.join(&invite, a);
        registry.join(&invite, b);

        let sender = {
            let registry = Arc::clone(&registry);
            let invite = invite.clone();
            tokio::spawn(async move {
                let mut delivered = 0;
                for i in 0..3 {
                    delivered += registry
                        .broadcast(&invite, ConnectionId::new(1), Payload::text(format!("{i}")))
                        .await
                        .delivered;
                }
                delivered
            })
        };

        for i in 0..3 {
            assert_eq!(rx_b.recv().await, Some(Payload::text(format!("{i}"))));
        }
        assert_eq!(sender.await.unwrap(), 3);
        assert!(registry.contains(&invite, ConnectionId::new(2)));
    }

    #[tokio::test]
    async fn test_concurrent_join_leave_leaves_no_empty_rooms() {
        let registry = Arc::new(RoomRegistry::new());
        let mut tasks = Vec::new();

        for id in 0..64u64 {
            let registry = Arc::clone(&registry);
            tasks.push(tokio::spawn(async move {
                let invite = InviteToken::new(format!("room-{}", id % 4));
                let (handle, _rx) = ConnectionHandle::channel(ConnectionId::new(id), 4);
                for _ in 0..50 {
                    registry.join(&invite, handle.clone());
                    tokio::task::yield_now().await;
                    registry.leave(&invite, handle.id());
                }
            }));
        }

        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(registry.room_count(), 0);
        assert!(registry.rooms().is_empty());
    }

    #[test]
    fn test_room_stats() {
        let registry = RoomRegistry::new();
        let invite = InviteToken::from("room");
        let (a, _rx_a) = member(1);
        registry.join(&invite, a);

        let stats = registry.room_stats(&invite).unwrap();
        assert_eq!(stats.invite, invite);
        assert_eq!(stats.members, 1);

        let all = registry.rooms();
        assert_eq!(all.len(), 1);
    }
}

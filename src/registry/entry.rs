//! Room entry and state types
//!
//! This module defines the per-room membership stored in the registry.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use super::frame::InviteToken;
use super::handle::{ConnectionHandle, ConnectionId};

/// Membership of a single room
pub struct Room {
    /// Member handles keyed by connection id
    members: HashMap<ConnectionId, ConnectionHandle>,

    /// When the room was created
    pub created_at: Instant,
}

impl Room {
    /// Create an empty room
    pub(super) fn new() -> Self {
        Self {
            members: HashMap::new(),
            created_at: Instant::now(),
        }
    }

    /// Add a member; returns false if it was already present
    pub(super) fn insert(&mut self, handle: ConnectionHandle) -> bool {
        let id = handle.id();
        if self.members.contains_key(&id) {
            return false;
        }
        self.members.insert(id, handle);
        true
    }

    /// Remove a member; returns false if it was not present
    pub(super) fn remove(&mut self, id: ConnectionId) -> bool {
        self.members.remove(&id).is_some()
    }

    /// Whether a connection is a member
    pub fn contains(&self, id: ConnectionId) -> bool {
        self.members.contains_key(&id)
    }

    /// Number of members
    pub fn len(&self) -> usize {
        self.members.len()
    }

    /// Whether the room has no members
    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    /// Snapshot of every member except `sender`
    pub(super) fn recipients(&self, sender: ConnectionId) -> Vec<ConnectionHandle> {
        self.members
            .values()
            .filter(|handle| handle.id() != sender)
            .cloned()
            .collect()
    }
}

/// Result of a join
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoomState {
    /// Member count after the join
    pub members: usize,
    /// The room did not exist before this join
    pub created: bool,
    /// The connection was not already a member
    pub newly_joined: bool,
}

/// Result of a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Fanout {
    /// Members that received the payload
    pub delivered: usize,
    /// Members found non-viable and removed during this pass
    pub evicted: usize,
}

/// Statistics for a room
#[derive(Debug, Clone)]
pub struct RoomStats {
    /// Room key
    pub invite: InviteToken,
    /// Number of members
    pub members: usize,
    /// Time since the room was created
    pub age: Duration,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn handle(id: u64) -> ConnectionHandle {
        ConnectionHandle::channel(ConnectionId::new(id), 1).0
    }

    #[test]
    fn test_insert_is_set_semantics() {
        let mut room = Room::new();

        assert!(room.insert(handle(1)));
        assert!(!room.insert(handle(1)));
        assert!(room.insert(handle(2)));
        assert_eq!(room.len(), 2);
    }

    #[test]
    fn test_recipients_exclude_sender() {
        let mut room = Room::new();
        room.insert(handle(1));
        room.insert(handle(2));
        room.insert(handle(3));

        let mut ids: Vec<u64> = room
            .recipients(ConnectionId::new(2))
            .iter()
            .map(|h| h.id().get())
            .collect();
        ids.sort_unstable();

        assert_eq!(ids, vec![1, 3]);
    }

    #[test]
    fn test_remove() {
        let mut room = Room::new();
        room.insert(handle(1));

        assert!(room.remove(ConnectionId::new(1)));
        assert!(!room.remove(ConnectionId::new(1)));
        assert!(room.is_empty());
    }
}

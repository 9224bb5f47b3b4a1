//! Session state machine
//!
//! Tracks the state of a relay session from connection to disconnection.
//!
//! ```text
//! Unjoined --join--> Joined --close--> Closed
//!    │                  │
//!    └──other/malformed─┘ (self-loops)
//! ```
//!
//! There is no transition out of `Joined` other than closing: switching rooms
//! requires a new connection.

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use crate::registry::{ConnectionId, InviteToken};

/// Session lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionPhase {
    /// Connected, no room yet; non-join messages are dropped
    Unjoined,
    /// Member of exactly one room
    Joined,
    /// Session closed
    Closed,
}

/// Complete session state
#[derive(Debug)]
pub struct SessionState {
    /// Connection id
    pub id: ConnectionId,

    /// Remote peer address
    pub peer_addr: SocketAddr,

    /// Current phase
    pub phase: SessionPhase,

    /// Connection start time
    pub connected_at: Instant,

    /// Time the session joined its room
    pub joined_at: Option<Instant>,

    /// Room joined by this session; set at most once
    invite: Option<InviteToken>,

    /// Frames read from the client
    pub messages_received: u64,

    /// Frames handed to the room for fan-out
    pub messages_relayed: u64,
}

impl SessionState {
    /// Create a new session state
    pub fn new(id: ConnectionId, peer_addr: SocketAddr) -> Self {
        Self {
            id,
            peer_addr,
            phase: SessionPhase::Unjoined,
            connected_at: Instant::now(),
            joined_at: None,
            invite: None,
            messages_received: 0,
            messages_relayed: 0,
        }
    }

    /// Record the room this session joined
    ///
    /// Returns false, leaving the state untouched, unless the session is
    /// still unjoined.
    pub fn on_join(&mut self, invite: InviteToken) -> bool {
        if self.phase != SessionPhase::Unjoined {
            return false;
        }

        self.invite = Some(invite);
        self.joined_at = Some(Instant::now());
        self.phase = SessionPhase::Joined;
        true
    }

    /// Room joined by this session, if any
    pub fn invite(&self) -> Option<&InviteToken> {
        self.invite.as_ref()
    }

    /// Check if the session has joined a room
    pub fn is_joined(&self) -> bool {
        self.phase == SessionPhase::Joined
    }

    /// Mark the session closed
    pub fn close(&mut self) {
        self.phase = SessionPhase::Closed;
    }

    /// Get session duration
    pub fn duration(&self) -> Duration {
        self.connected_at.elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::{IpAddr, Ipv4Addr};

    fn state() -> SessionState {
        let addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 50000);
        SessionState::new(ConnectionId::new(1), addr)
    }

    #[test]
    fn test_session_lifecycle() {
        let mut state = state();
        assert_eq!(state.phase, SessionPhase::Unjoined);
        assert!(state.invite().is_none());

        assert!(state.on_join(InviteToken::from("abc123")));
        assert_eq!(state.phase, SessionPhase::Joined);
        assert!(state.is_joined());
        assert!(state.joined_at.is_some());

        state.close();
        assert_eq!(state.phase, SessionPhase::Closed);
        assert!(!state.is_joined());
    }

    #[test]
    fn test_invite_is_set_once() {
        let mut state = state();

        assert!(state.on_join(InviteToken::from("first")));
        assert!(!state.on_join(InviteToken::from("second")));

        assert_eq!(state.invite(), Some(&InviteToken::from("first")));
    }

    #[test]
    fn test_cannot_join_after_close() {
        let mut state = state();
        state.close();

        assert!(!state.on_join(InviteToken::from("late")));
        assert!(state.invite().is_none());
    }
}

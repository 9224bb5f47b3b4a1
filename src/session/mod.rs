//! Relay session handling
//!
//! A session owns one connection for its whole lifetime. It joins at most one
//! room, relays everything else into that room, and leaves the room when the
//! connection ends, whatever the cause.

pub mod handler;
pub mod state;

pub use handler::{Disposition, Session};
pub use state::{SessionPhase, SessionState};

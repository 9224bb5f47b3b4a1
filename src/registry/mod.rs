//! Room registry for invite-keyed fan-out
//!
//! The registry maps invite tokens to the set of connections currently in that
//! room and delivers relayed payloads to them.
//!
//! # Architecture
//!
//! ```text
//!                          Arc<RoomRegistry>
//!                     ┌──────────────────────────┐
//!                     │ rooms: HashMap<Invite,   │
//!                     │   Mutex<Room {           │
//!                     │     members: {id→handle} │
//!                     │   }>                     │
//!                     │ >                        │
//!                     └────────────┬─────────────┘
//!                                  │
//!         ┌────────────────────────┼────────────────────────┐
//!         │                        │                        │
//!         ▼                        ▼                        ▼
//!    [Session A]              [Session B]              [Session C]
//!    read frame               outbound_rx.recv()       outbound_rx.recv()
//!         │                        │                        │
//!         └──► registry.broadcast()──► handle.deliver() ──► WebSocket
//! ```
//!
//! # Lifecycle
//!
//! Rooms are created by the first `join` and removed as soon as their last
//! member leaves. A member whose connection has gone away without leaving is
//! evicted lazily by the next broadcast that fails to reach it.

pub mod entry;
pub mod frame;
pub mod handle;
pub mod membership;
pub mod store;

pub use entry::{Fanout, Room, RoomState, RoomStats};
pub use frame::{InviteToken, Payload};
pub use handle::{ConnectionHandle, ConnectionId, Undeliverable};
pub use membership::Membership;
pub use store::RoomRegistry;

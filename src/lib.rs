//! # room-relay
//!
//! A room-based WebSocket message relay.
//!
//! Clients join a room by sending `{"type":"join","invite":"<token>"}` and
//! receive `{"type":"joined","invite":"<token>"}` in reply. Every other JSON
//! message a joined client sends is forwarded verbatim to the other members of
//! its room. Rooms exist only while they have members; nothing is persisted.
//!
//! ## Running a relay
//!
//! ```no_run
//! use room_relay::{RelayServer, ServerConfig};
//!
//! # async fn example() -> room_relay::Result<()> {
//! let server = RelayServer::new(ServerConfig::default());
//! server
//!     .run_until(async {
//!         let _ = tokio::signal::ctrl_c().await;
//!     })
//!     .await
//! # }
//! ```
//!
//! ## Modules
//!
//! - [`registry`]: room membership and fan-out
//! - [`session`]: per-connection join/relay state machine
//! - [`server`]: TCP/WebSocket accept loop
//! - [`client`]: joining a room from Rust
//! - [`protocol`]: wire envelopes

pub mod client;
pub mod error;
pub mod protocol;
pub mod registry;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use registry::{InviteToken, Payload, RoomRegistry};
pub use server::{RelayServer, ServerConfig};

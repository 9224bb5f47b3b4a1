//! Relay server
//!
//! Accepts TCP connections, upgrades them to WebSocket, and runs one session
//! per connection against a shared [`RoomRegistry`](crate::registry::RoomRegistry).

pub mod config;
pub(crate) mod connection;
pub mod listener;

pub use config::{parse_host, ServerConfig};
pub use listener::RelayServer;

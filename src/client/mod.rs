//! Relay client
//!
//! Joins a room on a running relay and exchanges messages with the other
//! members.

pub mod config;
pub mod peer;

pub use config::ClientConfig;
pub use peer::{PeerEvent, RelayPeer};

//! Relay protocol
//!
//! JSON envelopes carried over WebSocket text or binary frames.

pub mod envelope;

pub use envelope::{classify, ControlMessage, Inbound};

/// Default relay port
pub const DEFAULT_PORT: u16 = 8787;

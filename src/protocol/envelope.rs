//! Relay wire envelopes
//!
//! Only one inbound shape is meaningful to the relay:
//!
//! ```text
//! join request:  { "type": "join",   "invite": "<string>" }
//! join ack:      { "type": "joined", "invite": "<string>" }
//! ```
//!
//! Every other JSON value is an opaque relay payload. Input that is not JSON
//! at all is malformed and dropped.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::registry::{InviteToken, Payload};

/// Control messages exchanged between relay and client
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ControlMessage {
    /// Client asks to join a room
    Join { invite: String },
    /// Relay confirms a join
    Joined { invite: String },
}

impl ControlMessage {
    /// Join request for a room
    pub fn join(invite: &InviteToken) -> Self {
        ControlMessage::Join {
            invite: invite.as_str().to_owned(),
        }
    }

    /// Acknowledgement for a join
    pub fn joined(invite: &InviteToken) -> Self {
        ControlMessage::Joined {
            invite: invite.as_str().to_owned(),
        }
    }

    /// Encode as a text payload
    pub fn to_payload(&self) -> serde_json::Result<Payload> {
        serde_json::to_string(self).map(Payload::text)
    }
}

/// How the relay treats one inbound frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Inbound {
    /// A well-formed join request
    Join(InviteToken),
    /// `type` is "join" but `invite` is missing, empty, or not a string
    InvalidJoin,
    /// Any other JSON value; relayed verbatim
    Relay,
    /// Not JSON
    Malformed,
}

/// Classify a raw inbound frame
pub fn classify(raw: &[u8]) -> Inbound {
    let value: Value = match serde_json::from_slice(raw) {
        Ok(value) => value,
        Err(_) => return Inbound::Malformed,
    };

    if value.get("type").and_then(Value::as_str) != Some("join") {
        return Inbound::Relay;
    }

    match value.get("invite").and_then(Value::as_str) {
        Some(invite) if !invite.is_empty() => Inbound::Join(InviteToken::new(invite)),
        _ => Inbound::InvalidJoin,
    }
}

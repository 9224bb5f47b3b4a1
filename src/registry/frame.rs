//! Room keys and relayed payloads
//!
//! This module defines the key type identifying rooms and the opaque payload
//! that is fanned out to room members.

use std::sync::Arc;

use bytes::Bytes;

/// Client-supplied room identifier
///
/// Opaque and case-sensitive. No format or length validation is applied;
/// the empty string is a valid token as far as the registry is concerned.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct InviteToken(String);

impl InviteToken {
    /// Create a new invite token
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Get the token as a string slice
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Consume the token, returning the inner string
    pub fn into_inner(self) -> String {
        self.0
    }
}

impl std::fmt::Display for InviteToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for InviteToken {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for InviteToken {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// A message to be relayed to room members
///
/// Cheap to clone: text is shared behind an `Arc<str>` and binary data is
/// reference-counted `Bytes`, so fanning out to N members never copies the body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Payload {
    /// UTF-8 text frame
    Text(Arc<str>),
    /// Binary frame
    Binary(Bytes),
}

impl Payload {
    /// Create a text payload
    pub fn text(text: impl Into<Arc<str>>) -> Self {
        Payload::Text(text.into())
    }

    /// Create a binary payload
    pub fn binary(data: impl Into<Bytes>) -> Self {
        Payload::Binary(data.into())
    }

    /// Raw bytes of the payload, regardless of frame kind
    pub fn as_bytes(&self) -> &[u8] {
        match self {
            Payload::Text(text) => text.as_bytes(),
            Payload::Binary(data) => data,
        }
    }

    /// Text content, if this is a text payload
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Payload::Text(text) => Some(text),
            Payload::Binary(_) => None,
        }
    }

    /// Payload size in bytes
    pub fn len(&self) -> usize {
        self.as_bytes().len()
    }

    /// Whether the payload is empty
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

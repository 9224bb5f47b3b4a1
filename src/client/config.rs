//! Client configuration

use std::time::Duration;

use crate::registry::InviteToken;

/// Relay client configuration
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Relay URL, e.g. `ws://localhost:8787`
    pub url: String,

    /// Room to join
    pub invite: InviteToken,

    /// How long to wait for the join acknowledgement
    pub join_timeout: Duration,

    /// Buffered inbound messages before the reader applies backpressure
    pub event_buffer: usize,
}

impl ClientConfig {
    /// Create a config for joining `invite` on the relay at `url`
    pub fn new(url: impl Into<String>, invite: impl Into<InviteToken>) -> Self {
        Self {
            url: url.into(),
            invite: invite.into(),
            join_timeout: Duration::from_secs(10),
            event_buffer: 256,
        }
    }

    /// Set join timeout
    pub fn join_timeout(mut self, timeout: Duration) -> Self {
        self.join_timeout = timeout;
        self
    }

    /// Set inbound buffer size (minimum 1)
    pub fn event_buffer(mut self, size: usize) -> Self {
        self.event_buffer = size.max(1);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_client_config() {
        let config = ClientConfig::new("ws://localhost:8787", "abc123")
            .join_timeout(Duration::from_secs(2))
            .event_buffer(0);

        assert_eq!(config.url, "ws://localhost:8787");
        assert_eq!(config.invite, InviteToken::from("abc123"));
        assert_eq!(config.join_timeout, Duration::from_secs(2));
        assert_eq!(config.event_buffer, 1);
    }
}

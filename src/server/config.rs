//! Server configuration

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use crate::protocol::DEFAULT_PORT;

/// Server configuration options
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind to
    pub bind_addr: SocketAddr,

    /// URL advertised to operators; derived from `bind_addr` when unset
    pub public_url: Option<String>,

    /// Maximum concurrent connections (0 = unlimited)
    pub max_connections: usize,

    /// WebSocket handshake must complete within this time
    pub handshake_timeout: Duration,

    /// Enable TCP_NODELAY (disable Nagle's algorithm)
    pub tcp_nodelay: bool,

    /// Per-connection outbound queue length
    pub outbound_queue_capacity: usize,

    /// Stats log interval (zero disables)
    pub stats_interval: Duration,

    /// How long shutdown waits for sessions to clean up
    pub shutdown_grace: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::new(IpAddr::V4(Ipv4Addr::UNSPECIFIED), DEFAULT_PORT),
            public_url: None,
            max_connections: 0, // Unlimited
            handshake_timeout: Duration::from_secs(10),
            tcp_nodelay: true,
            outbound_queue_capacity: 256,
            stats_interval: Duration::from_secs(60),
            shutdown_grace: Duration::from_secs(5),
        }
    }
}

impl ServerConfig {
    /// Create a new config with custom bind address
    pub fn with_addr(addr: SocketAddr) -> Self {
        Self {
            bind_addr: addr,
            ..Default::default()
        }
    }

    /// Set the bind address
    pub fn bind(mut self, addr: SocketAddr) -> Self {
        self.bind_addr = addr;
        self
    }

    /// Set the advertised URL
    pub fn with_public_url(mut self, url: impl Into<String>) -> Self {
        self.public_url = Some(url.into());
        self
    }

    /// Set maximum connections
    pub fn max_connections(mut self, max: usize) -> Self {
        self.max_connections = max;
        self
    }

    /// Set handshake timeout
    pub fn handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Set the per-connection outbound queue length (minimum 1)
    pub fn outbound_queue_capacity(mut self, capacity: usize) -> Self {
        self.outbound_queue_capacity = capacity.max(1);
        self
    }

    /// Set stats log interval
    pub fn stats_interval(mut self, interval: Duration) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Set shutdown grace period
    pub fn shutdown_grace(mut self, grace: Duration) -> Self {
        self.shutdown_grace = grace;
        self
    }

    /// URL clients should use to reach the relay
    ///
    /// Informational only. An unspecified bind address is shown as `localhost`.
    pub fn public_url(&self) -> String {
        if let Some(ref url) = self.public_url {
            return url.clone();
        }

        let port = self.bind_addr.port();
        match self.bind_addr.ip() {
            ip if ip.is_unspecified() => format!("ws://localhost:{}", port),
            IpAddr::V4(ip) => format!("ws://{}:{}", ip, port),
            IpAddr::V6(ip) => format!("ws://[{}]:{}", ip, port),
        }
    }
}

/// Parse a bind host.
///
/// Accepts an IPv4/IPv6 literal or `localhost` (mapped to 127.0.0.1).
pub fn parse_host(arg: &str) -> Result<IpAddr, String> {
    if arg.eq_ignore_ascii_case("localhost") {
        return Ok(IpAddr::V4(Ipv4Addr::LOCALHOST));
    }

    arg.trim_matches(|c| c == '[' || c == ']')
        .parse::<IpAddr>()
        .map_err(|_| {
            format!(
                "Invalid host: '{}'. Expected an IP address or 'localhost'",
                arg
            )
        })
}

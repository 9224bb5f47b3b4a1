//! Room relay server
//!
//! Run with: room-relay [--host HOST] [--port PORT] [--public-url URL]
//!
//! Every flag can also be set through the environment:
//!   RELAY_HOST=127.0.0.1 RELAY_PORT=9000 room-relay
//!
//! Logging is controlled with RUST_LOG (default: room_relay=info).

use std::net::{IpAddr, SocketAddr};
use std::process::ExitCode;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use room_relay::protocol::DEFAULT_PORT;
use room_relay::server::parse_host;
use room_relay::{RelayServer, ServerConfig};

#[derive(Debug, Parser)]
#[command(name = "room-relay", version, about = "Room-based WebSocket message relay")]
struct Args {
    /// Address to listen on (IP literal or 'localhost')
    #[arg(long, env = "RELAY_HOST", default_value = "0.0.0.0", value_parser = parse_host)]
    host: IpAddr,

    /// Port to listen on
    #[arg(long, env = "RELAY_PORT", default_value_t = DEFAULT_PORT)]
    port: u16,

    /// URL shown to operators and clients (default: derived from host and port)
    #[arg(long, env = "RELAY_PUBLIC_URL")]
    public_url: Option<String>,

    /// Maximum concurrent connections (0 = unlimited)
    #[arg(long, env = "RELAY_MAX_CONNECTIONS", default_value_t = 0)]
    max_connections: usize,

    /// Seconds to wait for sessions to clean up on shutdown
    #[arg(long, env = "RELAY_SHUTDOWN_GRACE_SECS", default_value_t = 5)]
    shutdown_grace_secs: u64,
}

impl Args {
    fn server_config(&self) -> ServerConfig {
        let mut config = ServerConfig::with_addr(SocketAddr::new(self.host, self.port))
            .max_connections(self.max_connections)
            .shutdown_grace(Duration::from_secs(self.shutdown_grace_secs));

        if let Some(ref url) = self.public_url {
            config = config.with_public_url(url.clone());
        }

        config
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();

    // Initialize logging
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("room_relay=info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let server = RelayServer::new(args.server_config());

    let listener = match server.bind().await {
        Ok(listener) => listener,
        Err(e) => {
            eprintln!("Error: {}", e);
            return ExitCode::FAILURE;
        }
    };

    println!("Relay listening on ws://{}", server.bind_addr());
    println!("Public URL: {}", server.config().public_url());
    println!();
    println!("Clients join a room with: {{\"type\":\"join\",\"invite\":\"<token>\"}}");

    match server.serve(listener, shutdown_signal()).await {
        Ok(()) => {
            println!("Relay stopped.");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("Server error: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    println!("\nShutting down...");
}

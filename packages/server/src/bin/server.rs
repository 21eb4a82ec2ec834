//! lamchat chat server.
//!
//! Relays chat messages between TCP clients. Every frame carries a Lamport
//! timestamp, and clients that stop sending heartbeats are evicted.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lamchat-server
//! cargo run --bin lamchat-server -- --host 127.0.0.1 --port 5000
//! ```

use std::time::Duration;

use clap::Parser;
use lamchat_server::{HeartbeatConfig, Server, ServerConfig, config::DEFAULT_PORT};
use lamchat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "lamchat-server")]
#[command(about = "Chat server with Lamport timestamps and heartbeat liveness", long_about = None)]
struct Args {
    /// Host address to bind the server to
    #[arg(short = 'H', long, default_value = "0.0.0.0")]
    host: String,

    /// Port number to bind the server to
    #[arg(short = 'p', long, default_value_t = DEFAULT_PORT)]
    port: u16,

    /// Interval at which clients send heartbeats, in milliseconds
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_period_ms: u64,

    /// Number of missed heartbeat periods before a client is evicted
    #[arg(long, default_value_t = 4, value_parser = clap::value_parser!(u32).range(1..))]
    heartbeat_factor: u32,

    /// How often to scan for stale connections, in milliseconds
    #[arg(long, default_value_t = 50, value_parser = clap::value_parser!(u64).range(1..))]
    scan_interval_ms: u64,
}

impl From<Args> for ServerConfig {
    fn from(args: Args) -> Self {
        Self {
            host: args.host,
            port: args.port,
            heartbeat: HeartbeatConfig {
                period: Duration::from_millis(args.heartbeat_period_ms),
                factor: args.heartbeat_factor,
                scan_interval: Duration::from_millis(args.scan_interval_ms),
            },
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "debug");

    let args = Args::parse();

    let server = match Server::bind(args.into()).await {
        Ok(server) => server,
        Err(e) => {
            tracing::error!("Server error: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = server.run().await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

//! lamchat console client.
//!
//! Connects to a lamchat server, sends every line typed on stdin and prints
//! what the server broadcasts together with its Lamport timestamps.
//! Type `:quit` (or press Ctrl+C) to leave.
//!
//! Run with:
//! ```not_rust
//! cargo run --bin lamchat-client -- 127.0.0.1 4444
//! ```

use std::time::Duration;

use clap::Parser;
use lamchat_client::{ClientConfig, run_client};
use lamchat_shared::logger::setup_logger;

#[derive(Parser, Debug)]
#[command(name = "lamchat-client")]
#[command(about = "Console chat client with Lamport timestamps", long_about = None)]
struct Args {
    /// Server host name or address
    host: String,

    /// Server port
    port: u16,

    /// Interval between heartbeat frames, in milliseconds
    #[arg(long, default_value_t = 200, value_parser = clap::value_parser!(u64).range(1..))]
    heartbeat_period_ms: u64,
}

impl From<Args> for ClientConfig {
    fn from(args: Args) -> Self {
        Self {
            heartbeat_period: Duration::from_millis(args.heartbeat_period_ms),
            ..ClientConfig::new(args.host, args.port)
        }
    }
}

#[tokio::main]
async fn main() {
    // Initialize tracing
    setup_logger(env!("CARGO_BIN_NAME"), "warn");

    let args = Args::parse();

    if let Err(e) = run_client(args.into()).await {
        tracing::error!("Client error: {}", e);
        eprintln!("{}", e);
        std::process::exit(1);
    }
}

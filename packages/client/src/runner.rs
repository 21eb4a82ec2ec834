//! Client execution logic.

use std::sync::Arc;

use lamchat_shared::LamportClock;
use tokio::{net::TcpStream, sync::mpsc};

use crate::{
    config::ClientConfig,
    error::ClientError,
    formatter::MessageFormatter,
    heartbeat::HeartbeatEmitter,
    input::spawn_input_relay,
    session::run_session,
    ui::ConsoleSink,
};

/// Connect and run one chat session.
///
/// Returns `Ok(())` when the server acknowledges `:quit`. There is no
/// reconnection; any connection failure ends the client.
pub async fn run_client(config: ClientConfig) -> Result<(), ClientError> {
    let addr = config.server_addr();
    tracing::info!("Attempting to connect to {}", addr);

    let stream = TcpStream::connect(&addr)
        .await
        .map_err(|source| ClientError::Connect {
            addr: addr.clone(),
            source,
        })?;
    if let Err(e) = stream.set_nodelay(true) {
        tracing::debug!("Failed to set TCP_NODELAY: {}", e);
    }

    let clock = Arc::new(LamportClock::with_random_seed());
    tracing::info!("Initial counter value: {}", clock.current());
    print!("{}", MessageFormatter::format_connected(&addr, clock.current()));

    let (outbound, queue) = mpsc::unbounded_channel();
    let heartbeat = HeartbeatEmitter::new(outbound.clone(), config.heartbeat_period).spawn();
    // The readline thread blocks on stdin and is left behind on exit
    let _input = spawn_input_relay(outbound);

    let mut sink = ConsoleSink;
    let result = run_session(stream, clock, queue, &mut sink).await;
    heartbeat.abort();

    if result.is_ok() {
        print!("\n{}", MessageFormatter::format_terminated());
    }
    result
}

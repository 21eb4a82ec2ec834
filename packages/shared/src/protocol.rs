//! Protocol-level constants both peers agree on.

use std::time::Duration;

/// Command an authenticated client sends to leave the chat room.
pub const QUIT_COMMAND: &str = ":quit";

/// Payload the server sends back before closing a connection that quit.
pub const QUIT_ACK: &str = "-1";

/// How often a client emits a heartbeat frame.
pub const DEFAULT_HEARTBEAT_PERIOD: Duration = Duration::from_millis(200);

/// Missed heartbeat periods after which the server evicts a connection.
pub const DEFAULT_HEARTBEAT_FACTOR: u32 = 4;

/// How often the server scans connections for staleness.
pub const DEFAULT_SCAN_INTERVAL: Duration = Duration::from_millis(50);

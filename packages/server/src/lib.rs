//! lamchat chat server.
//!
//! Accepts TCP connections, walks each through the username handshake and
//! fans chat messages out to every authenticated peer. Liveness is tracked
//! with heartbeat frames rather than TCP disconnect notifications.

pub mod config;
pub mod error;
pub mod heartbeat;
pub mod session;

mod connection;
mod runner;
mod signal;

pub use config::{HeartbeatConfig, ServerConfig};
pub use error::ServerError;
pub use runner::Server;

//! Server configuration.

use std::time::Duration;

use lamchat_shared::protocol::{
    DEFAULT_HEARTBEAT_FACTOR, DEFAULT_HEARTBEAT_PERIOD, DEFAULT_SCAN_INTERVAL,
};

/// Default port the server listens on
pub const DEFAULT_PORT: u16 = 4444;

/// Heartbeat timing the server enforces
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeartbeatConfig {
    /// Interval at which clients are expected to send heartbeats
    pub period: Duration,
    /// Number of periods a connection may stay silent
    pub factor: u32,
    /// How often the monitor scans for stale connections
    pub scan_interval: Duration,
}

impl HeartbeatConfig {
    /// Silence longer than this evicts a connection
    pub fn timeout(&self) -> Duration {
        self.period * self.factor
    }
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            period: DEFAULT_HEARTBEAT_PERIOD,
            factor: DEFAULT_HEARTBEAT_FACTOR,
            scan_interval: DEFAULT_SCAN_INTERVAL,
        }
    }
}

/// Everything needed to start a [`Server`](crate::Server)
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    /// Host address to bind to
    pub host: String,
    /// Port to bind to, `0` picks an ephemeral port
    pub port: u16,
    pub heartbeat: HeartbeatConfig,
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            heartbeat: HeartbeatConfig::default(),
        }
    }
}

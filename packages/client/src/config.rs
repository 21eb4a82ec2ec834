//! Client configuration.

use std::time::Duration;

use lamchat_shared::protocol::DEFAULT_HEARTBEAT_PERIOD;

/// Everything needed to run a client session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    /// Server host name or address
    pub host: String,
    /// Server port
    pub port: u16,
    /// Interval between heartbeat frames
    pub heartbeat_period: Duration,
}

impl ClientConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            heartbeat_period: DEFAULT_HEARTBEAT_PERIOD,
        }
    }

    pub fn server_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

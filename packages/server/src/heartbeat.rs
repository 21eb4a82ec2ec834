//! Heartbeat monitor
//!
//! Periodically scans the chat room and evicts every connection that has
//! been silent for longer than `factor * period`. Any inbound frame counts as
//! a liveness signal, heartbeats and chat messages alike.

use std::{net::SocketAddr, sync::Arc};

use lamchat_shared::time::Clock;
use tokio::{
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

use crate::{config::HeartbeatConfig, session::ChatRoom};

/// Evicts stale connections from a [`ChatRoom`]
pub struct HeartbeatMonitor {
    room: Arc<ChatRoom>,
    clock: Arc<dyn Clock>,
    config: HeartbeatConfig,
}

impl HeartbeatMonitor {
    pub fn new(room: Arc<ChatRoom>, clock: Arc<dyn Clock>, config: HeartbeatConfig) -> Self {
        Self {
            room,
            clock,
            config,
        }
    }

    /// Run a single staleness scan and return what was evicted
    pub async fn scan(&self) -> Vec<(SocketAddr, Option<String>)> {
        let evicted = self
            .room
            .evict_stale(self.clock.now_millis(), self.config.timeout())
            .await;

        for (addr, username) in &evicted {
            match username {
                Some(name) => tracing::info!("Heartbeat timeout: evicted '{}' ({})", name, addr),
                None => tracing::info!("Heartbeat timeout: evicted {}", addr),
            }
        }

        evicted
    }

    /// Start scanning every `scan_interval` on a background task
    pub fn spawn(self) -> JoinHandle<()> {
        tracing::info!(
            "Heartbeat monitor started ({:?} scan interval, {:?} timeout)",
            self.config.scan_interval,
            self.config.timeout()
        );

        tokio::spawn(async move {
            let mut ticker = interval(self.config.scan_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                self.scan().await;
            }
        })
    }
}

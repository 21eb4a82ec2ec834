//! Client-side heartbeat emission.

use std::time::Duration;

use tokio::{
    sync::mpsc,
    task::JoinHandle,
    time::{MissedTickBehavior, interval},
};

/// Enqueues an empty payload on a fixed period.
///
/// The payload goes through the same outbound queue as chat lines, so it is
/// stamped by the clock only when the session actually writes it.
pub struct HeartbeatEmitter {
    outbound: mpsc::UnboundedSender<String>,
    period: Duration,
}

impl HeartbeatEmitter {
    pub fn new(outbound: mpsc::UnboundedSender<String>, period: Duration) -> Self {
        Self { outbound, period }
    }

    /// Emit until the session drops its end of the queue
    pub fn spawn(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = interval(self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if self.outbound.send(String::new()).is_err() {
                    tracing::debug!("Outbound queue closed, stopping heartbeats");
                    break;
                }
            }
        })
    }
}

//! Per-connection driver.
//!
//! One driver runs per accepted socket and is the only code touching it. It
//! waits on three readiness sources at once:
//!
//! 1. an eviction notice from the heartbeat monitor (closes immediately),
//! 2. the outbound queue (write path: tick, encode, write),
//! 3. the socket becoming readable (read path: decode, observe, dispatch).
//!
//! When the room drops the outbound queue (after `:quit`) the driver has
//! already flushed everything queued before the drop, so the acknowledgement
//! reaches the peer before the socket is closed.

use std::{net::SocketAddr, sync::Arc};

use lamchat_shared::{
    FramedTransport, LamportClock, Liveness, Received, TransportError, time::Clock,
};
use tokio::{
    io::{AsyncRead, AsyncWrite},
    sync::mpsc,
};

use crate::session::{ChatRoom, CloseReason, PeerHandle};

pub(crate) struct ConnectionDriver {
    pub room: Arc<ChatRoom>,
    pub clock: Arc<LamportClock>,
    pub time: Arc<dyn Clock>,
}

impl ConnectionDriver {
    /// Serve one peer until it quits, times out or fails
    pub async fn run<S>(&self, stream: S, addr: SocketAddr)
    where
        S: AsyncRead + AsyncWrite + Unpin,
    {
        let (outbound, mut queue) = mpsc::unbounded_channel();
        let liveness = Arc::new(Liveness::new(self.time.now_millis()));
        let handle = PeerHandle::new(outbound, liveness.clone());
        let evicted = handle.evicted.clone();

        self.room.register(addr, handle).await;
        tracing::info!("Accepted connection from: {}", addr);

        let mut transport = FramedTransport::new(stream, self.clock.clone());

        let reason = loop {
            tokio::select! {
                biased;

                _ = evicted.notified() => break CloseReason::HeartbeatTimeout,

                next = queue.recv() => {
                    let Some(payload) = next else {
                        // the room released this connection after a quit
                        break CloseReason::Quit;
                    };
                    // a peer that stops reading can stall the write
                    tokio::select! {
                        biased;

                        _ = evicted.notified() => break CloseReason::HeartbeatTimeout,

                        sent = transport.send(&payload) => match sent {
                            Ok(timestamp) => {
                                tracing::debug!("Message sent at: {} to {}", timestamp, addr);
                            }
                            Err(e) => {
                                tracing::warn!("Write to {} failed: {}", addr, e);
                                break CloseReason::TransportError;
                            }
                        },
                    }
                }

                read = transport.read_frames() => match read {
                    Ok(Some(batch)) => {
                        for received in batch {
                            self.dispatch(addr, &liveness, received).await;
                        }
                    }
                    Ok(None) => break CloseReason::PeerClosed,
                    Err(TransportError::Protocol(e)) => {
                        tracing::warn!("Protocol violation from {}: {}", addr, e);
                        break CloseReason::ProtocolViolation;
                    }
                    Err(TransportError::Io(e)) => {
                        tracing::warn!("Read from {} failed: {}", addr, e);
                        break CloseReason::TransportError;
                    }
                },
            }
        };

        self.room.close(addr, reason).await;
        transport.shutdown().await;
        tracing::debug!("Driver for {} finished ({})", addr, reason);
    }

    async fn dispatch(&self, addr: SocketAddr, liveness: &Liveness, received: Received) {
        liveness.touch(self.time.now_millis());

        let frame = received.frame;
        if frame.is_heartbeat() {
            tracing::trace!("Heartbeat from {} (ts {})", addr, frame.timestamp);
            return;
        }

        tracing::debug!(
            "Message received from {}. Sent at: {}, received at: {}",
            addr,
            frame.timestamp,
            received.received_at
        );
        let event = self.room.handle_text(addr, &frame.text()).await;
        tracing::trace!("{} -> {:?}", addr, event);
    }
}

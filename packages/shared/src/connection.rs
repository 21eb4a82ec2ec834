//! Per-connection plumbing shared by the server and client drivers.
//!
//! [`FramedTransport`] owns the byte stream plus its receive and scratch
//! buffers and applies the Lamport clock discipline on both paths: the clock
//! ticks right before a frame is encoded and observes every decoded frame
//! before it is handed to the caller.

use std::{
    sync::{
        Arc,
        atomic::{AtomicU64, Ordering},
    },
    time::Duration,
};

use bytes::BytesMut;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::{
    clock::LamportClock,
    error::TransportError,
    frame::{self, Frame},
};

const READ_BUF_CAPACITY: usize = 2048;

/// A decoded frame together with the local clock value after observing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Received {
    pub frame: Frame,
    /// Local Lamport counter right after `observe`
    pub received_at: i64,
}

/// Framed, clock-stamped view over a byte stream
#[derive(Debug)]
pub struct FramedTransport<S> {
    stream: S,
    read_buf: BytesMut,
    write_buf: BytesMut,
    clock: Arc<LamportClock>,
}

impl<S> FramedTransport<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, clock: Arc<LamportClock>) -> Self {
        Self {
            stream,
            read_buf: BytesMut::with_capacity(READ_BUF_CAPACITY),
            write_buf: BytesMut::with_capacity(READ_BUF_CAPACITY),
            clock,
        }
    }

    /// Wait until the stream is readable, then decode every complete frame.
    ///
    /// Returns `Ok(None)` on end-of-stream. The returned batch may be empty
    /// when only part of a frame has arrived; the remainder is kept for the
    /// next call.
    ///
    /// # Cancel safety
    ///
    /// The only await point is the read into the internal buffer, which is
    /// cancel safe, so this can be used as a `tokio::select!` branch.
    pub async fn read_frames(&mut self) -> Result<Option<Vec<Received>>, TransportError> {
        let read = self.stream.read_buf(&mut self.read_buf).await?;
        if read == 0 {
            return Ok(None);
        }

        let mut batch = Vec::new();
        for decoded in frame::decode(&mut self.read_buf) {
            let frame = decoded?;
            let received_at = self.clock.observe(frame.timestamp);
            batch.push(Received { frame, received_at });
        }

        Ok(Some(batch))
    }

    /// Stamp `payload` with a fresh clock tick, write the whole frame and
    /// return the timestamp used.
    pub async fn send(&mut self, payload: &str) -> Result<i64, TransportError> {
        let timestamp = self.clock.tick();
        let bytes = frame::encode(timestamp, payload.as_bytes(), &mut self.write_buf)?;
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(timestamp)
    }

    /// Flush and close the write half of the stream
    pub async fn shutdown(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!("Ignoring error while shutting down stream: {}", e);
        }
    }

    pub fn clock(&self) -> &Arc<LamportClock> {
        &self.clock
    }

    /// Underlying stream, bypassing the framing
    pub fn get_mut(&mut self) -> &mut S {
        &mut self.stream
    }
}

/// Timestamp of the most recent liveness signal from a peer.
///
/// Written by the connection driver on every inbound frame and read by the
/// heartbeat monitor, so a single atomic is enough.
#[derive(Debug)]
pub struct Liveness {
    last_heartbeat_at: AtomicU64,
}

impl Liveness {
    pub fn new(now_millis: u64) -> Self {
        Self {
            last_heartbeat_at: AtomicU64::new(now_millis),
        }
    }

    /// Record a liveness signal received at `now_millis`
    pub fn touch(&self, now_millis: u64) {
        self.last_heartbeat_at.store(now_millis, Ordering::Release);
    }

    pub fn last_heartbeat_at(&self) -> u64 {
        self.last_heartbeat_at.load(Ordering::Acquire)
    }

    /// `true` once strictly more than `timeout` has passed since the last signal
    pub fn is_stale(&self, now_millis: u64, timeout: Duration) -> bool {
        now_millis.saturating_sub(self.last_heartbeat_at()) > timeout.as_millis() as u64
    }
}

//! Frame codec.
//!
//! Every frame is laid out big-endian as
//!
//! ```text
//! +----------------+------------------+-----------------------+
//! | timestamp: i64 | payload_len: i32 | payload (UTF-8 bytes) |
//! +----------------+------------------+-----------------------+
//! ```
//!
//! A frame with an empty payload is a heartbeat.
//!
//! Decoding works on a receive buffer that accumulates bytes across reads.
//! A frame whose header or payload has not fully arrived stays in the buffer
//! and is picked up by the next call to [`decode`], so a message split across
//! two TCP segments is never truncated.

use std::borrow::Cow;

use bytes::{Buf, BufMut, Bytes, BytesMut};

use crate::error::FrameError;

/// Size of the fixed header: timestamp plus payload length.
pub const HEADER_LEN: usize = 8 + 4;

/// Largest payload a peer may declare.
pub const MAX_PAYLOAD_LEN: usize = 64 * 1024;

/// One decoded wire unit
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    /// Sender's logical clock value at send time
    pub timestamp: i64,
    /// Raw payload bytes
    pub payload: Bytes,
}

impl Frame {
    pub fn new(timestamp: i64, payload: impl Into<Bytes>) -> Self {
        Self {
            timestamp,
            payload: payload.into(),
        }
    }

    /// An empty payload marks a heartbeat
    pub fn is_heartbeat(&self) -> bool {
        self.payload.is_empty()
    }

    /// Payload as text, replacing invalid UTF-8 sequences
    pub fn text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(&self.payload)
    }
}

/// Encode a frame into `scratch` and return the bytes ready to be written.
///
/// The scratch buffer is cleared first so the same allocation can be reused
/// for every outbound frame of a connection.
///
/// # Errors
///
/// Returns [`FrameError::PayloadTooLarge`] if `payload` is longer than
/// [`MAX_PAYLOAD_LEN`].
pub fn encode<'a>(
    timestamp: i64,
    payload: &[u8],
    scratch: &'a mut BytesMut,
) -> Result<&'a [u8], FrameError> {
    if payload.len() > MAX_PAYLOAD_LEN {
        return Err(FrameError::PayloadTooLarge {
            len: payload.len(),
            max: MAX_PAYLOAD_LEN,
        });
    }

    scratch.clear();
    scratch.reserve(HEADER_LEN + payload.len());
    scratch.put_i64(timestamp);
    scratch.put_i32(payload.len() as i32);
    scratch.put_slice(payload);

    Ok(&scratch[..])
}

/// Lazily decode every complete frame at the front of `buf`.
///
/// Each yielded frame removes exactly `HEADER_LEN + payload_len` bytes from
/// the buffer. Iteration stops at the first incomplete frame, leaving it in
/// place. After an error the iterator is exhausted and the buffer should be
/// discarded along with the connection.
pub fn decode(buf: &mut BytesMut) -> Decode<'_> {
    Decode { buf, failed: false }
}

/// Iterator returned by [`decode`]
#[derive(Debug)]
pub struct Decode<'a> {
    buf: &'a mut BytesMut,
    failed: bool,
}

impl Iterator for Decode<'_> {
    type Item = Result<Frame, FrameError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed || self.buf.len() < HEADER_LEN {
            return None;
        }

        let mut header = &self.buf[..HEADER_LEN];
        let timestamp = header.get_i64();
        let declared = header.get_i32();

        let len = match usize::try_from(declared) {
            Ok(len) if len <= MAX_PAYLOAD_LEN => len,
            Ok(len) => {
                self.failed = true;
                return Some(Err(FrameError::PayloadTooLarge {
                    len,
                    max: MAX_PAYLOAD_LEN,
                }));
            }
            Err(_) => {
                self.failed = true;
                return Some(Err(FrameError::NegativeLength(declared)));
            }
        };

        if self.buf.len() < HEADER_LEN + len {
            // partial frame, wait for more bytes
            self.buf.reserve(HEADER_LEN + len - self.buf.len());
            return None;
        }

        self.buf.advance(HEADER_LEN);
        let payload = self.buf.split_to(len).freeze();

        Some(Ok(Frame { timestamp, payload }))
    }
}

//! Error types for the wire protocol and transport.

use thiserror::Error;

/// Violations of the frame layout
#[derive(Debug, Error, PartialEq, Eq)]
pub enum FrameError {
    /// The length field decoded to a negative number
    #[error("Negative payload length: {0}")]
    NegativeLength(i32),

    /// The payload is larger than the protocol allows
    #[error("Payload of {len} bytes exceeds the {max} byte limit")]
    PayloadTooLarge { len: usize, max: usize },
}

/// Failures observed while driving a framed connection
#[derive(Debug, Error)]
pub enum TransportError {
    /// Read or write on the underlying stream failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer sent bytes that do not form a valid frame
    #[error("Protocol violation: {0}")]
    Protocol(#[from] FrameError),
}

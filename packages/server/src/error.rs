//! Error types for the chat server.

use thiserror::Error;

/// Server-level errors.
///
/// Per-connection failures never surface here; they close the affected
/// connection only.
#[derive(Debug, Error)]
pub enum ServerError {
    /// The listening socket could not be bound
    #[error("Failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Other I/O failure on the listening socket
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

//! Error types for the chat client.

use lamchat_shared::TransportError;
use thiserror::Error;

/// Client-specific errors.
///
/// Every variant is fatal: the client has a single connection and exits
/// once it fails.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server could not be reached
    #[error("Failed to connect to {addr}: {source}")]
    Connect {
        addr: String,
        #[source]
        source: std::io::Error,
    },

    /// Connection error
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Read, write or framing failure on the open connection
    #[error(transparent)]
    Transport(#[from] TransportError),
}

//! Shared building blocks for the lamchat server and client.
//!
//! Both binaries speak the same framed TCP protocol and follow the same
//! Lamport clock discipline, so everything below the session layer lives here.

pub mod clock;
pub mod connection;
pub mod error;
pub mod frame;
pub mod logger;
pub mod protocol;
pub mod time;

pub use clock::LamportClock;
pub use connection::{FramedTransport, Liveness, Received};
pub use error::{FrameError, TransportError};
pub use frame::Frame;

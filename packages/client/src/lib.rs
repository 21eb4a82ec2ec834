//! lamchat console client.
//!
//! Connects to a lamchat server, relays console lines as chat frames, emits
//! heartbeats in the background and renders every frame the server sends.

pub mod config;
pub mod error;
pub mod formatter;
pub mod heartbeat;
pub mod input;
pub mod session;
pub mod ui;

mod runner;

pub use config::ClientConfig;
pub use error::ClientError;
pub use runner::run_client;

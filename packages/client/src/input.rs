//! Console input relay.
//!
//! Reads lines on a dedicated OS thread (rustyline is synchronous) and
//! forwards every non-blank line to the outbound queue. The relay never
//! touches the Lamport clock; lines are stamped when they are written.

use lamchat_shared::protocol::QUIT_COMMAND;
use rustyline::{DefaultEditor, error::ReadlineError};
use tokio::sync::mpsc;

/// Prompt shown while waiting for input
pub const PROMPT: &str = "> ";

/// Trim a console line, dropping it if nothing is left
pub fn normalize_line(line: &str) -> Option<String> {
    let line = line.trim();
    if line.is_empty() {
        None
    } else {
        Some(line.to_string())
    }
}

/// Spawn the blocking readline thread.
///
/// Ctrl+C and Ctrl+D enqueue `:quit` so the server can close the session
/// cleanly.
pub fn spawn_input_relay(outbound: mpsc::UnboundedSender<String>) -> std::thread::JoinHandle<()> {
    std::thread::spawn(move || {
        let mut rl = match DefaultEditor::new() {
            Ok(rl) => rl,
            Err(e) => {
                tracing::error!("Failed to initialize readline: {}", e);
                outbound.send(QUIT_COMMAND.to_string()).ok();
                return;
            }
        };

        loop {
            match rl.readline(PROMPT) {
                Ok(line) => {
                    let Some(line) = normalize_line(&line) else {
                        continue;
                    };
                    rl.add_history_entry(line.as_str()).ok();
                    if outbound.send(line).is_err() {
                        // Channel closed, exit thread
                        break;
                    }
                }
                Err(ReadlineError::Interrupted) => {
                    tracing::info!("Interrupted");
                    outbound.send(QUIT_COMMAND.to_string()).ok();
                    break;
                }
                Err(ReadlineError::Eof) => {
                    tracing::info!("EOF");
                    outbound.send(QUIT_COMMAND.to_string()).ok();
                    break;
                }
                Err(err) => {
                    tracing::error!("Readline error: {}", err);
                    outbound.send(QUIT_COMMAND.to_string()).ok();
                    break;
                }
            }
        }
    })
}

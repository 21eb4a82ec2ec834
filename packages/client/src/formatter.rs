//! Message formatting utilities for client display.

use chrono::{DateTime, Local};
use lamchat_shared::time::format_local_time;

use crate::session::ReceivedMessage;

/// Message formatter for client display
pub struct MessageFormatter;

impl MessageFormatter {
    /// Format a message received from the server
    ///
    /// # Arguments
    ///
    /// * `message` - The received message with its Lamport timestamps
    /// * `local_time` - Wall-clock time the message was displayed
    ///
    /// # Returns
    ///
    /// The message text followed by its send and receive timestamps
    pub fn format_received(message: &ReceivedMessage, local_time: DateTime<Local>) -> String {
        format!(
            "\n{}\nSent at: {}, received at: {} ({})\n",
            message.text,
            message.sent_at,
            message.received_at,
            format_local_time(local_time)
        )
    }

    /// Format a confirmation message after sending
    pub fn format_sent_confirmation(sent_at: i64) -> String {
        format!("Message sent at: {}\n", sent_at)
    }

    /// Format the banner shown once the connection is open
    pub fn format_connected(server_addr: &str, initial_counter: i64) -> String {
        format!(
            "Connected to {} (initial counter value: {})\n",
            server_addr, initial_counter
        )
    }

    pub fn format_terminated() -> String {
        "Connection terminated!\n".to_string()
    }
}

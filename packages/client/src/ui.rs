//! UI utilities for the client.

use std::io::Write;

use chrono::Local;

use crate::{
    formatter::MessageFormatter,
    input::PROMPT,
    session::{MessageSink, ReceivedMessage},
};

/// Redisplay the prompt after printing over it
pub fn redisplay_prompt() {
    print!("{}", PROMPT);
    std::io::stdout().flush().ok();
}

/// Prints session events to standard output
#[derive(Debug, Default)]
pub struct ConsoleSink;

impl MessageSink for ConsoleSink {
    fn on_message(&mut self, message: &ReceivedMessage) {
        print!("{}", MessageFormatter::format_received(message, Local::now()));
        redisplay_prompt();
    }

    fn on_sent(&mut self, timestamp: i64) {
        print!("{}", MessageFormatter::format_sent_confirmation(timestamp));
        redisplay_prompt();
    }
}

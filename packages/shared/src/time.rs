//! Time-related utilities with clock abstraction for testability.
//!
//! Liveness bookkeeping needs a monotonic millisecond reading that tests can
//! control, while the console only needs a human-readable wall-clock string.

use std::{
    sync::{
        OnceLock,
        atomic::{AtomicU64, Ordering},
    },
    time::{Duration, Instant},
};

use chrono::{DateTime, Local};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Milliseconds elapsed on a monotonic timeline
    fn now_millis(&self) -> u64;
}

/// System clock implementation (monotonic, measured from first use)
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now_millis(&self) -> u64 {
        static ORIGIN: OnceLock<Instant> = OnceLock::new();
        let origin = *ORIGIN.get_or_init(Instant::now);
        origin.elapsed().as_millis() as u64
    }
}

/// Manually driven clock for tests
#[derive(Debug, Default)]
pub struct FixedClock {
    now: AtomicU64,
}

impl FixedClock {
    /// Create a new fixed clock reading `now_millis`
    pub fn new(now_millis: u64) -> Self {
        Self {
            now: AtomicU64::new(now_millis),
        }
    }

    /// Move the clock forward
    pub fn advance(&self, by: Duration) {
        self.now.fetch_add(by.as_millis() as u64, Ordering::SeqCst);
    }
}

impl Clock for FixedClock {
    fn now_millis(&self) -> u64 {
        self.now.load(Ordering::SeqCst)
    }
}

/// Format a wall-clock time as `HH:MM:SS` for console output
pub fn format_local_time(time: DateTime<Local>) -> String {
    time.format("%H:%M:%S").to_string()
}

/// Current local time as `HH:MM:SS`
pub fn local_time_now() -> String {
    format_local_time(Local::now())
}

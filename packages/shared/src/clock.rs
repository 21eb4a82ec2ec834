//! Lamport logical clock shared by every task of a process.

use std::sync::atomic::{AtomicI64, Ordering};

use rand::Rng;

/// The counter wraps back to 1 instead of reaching this value.
pub const MAX_COUNTER: i64 = 1_000_000;

/// Range the initial counter is drawn from, so separate runs rarely collide.
const SEED_RANGE: std::ops::RangeInclusive<i64> = 1..=100;

/// Lamport clock backed by a single atomic counter.
///
/// Every update is a compare-and-swap loop, so connection drivers, the
/// heartbeat task and the accept loop can share one instance behind an `Arc`.
#[derive(Debug)]
pub struct LamportClock {
    counter: AtomicI64,
}

impl LamportClock {
    /// Create a clock starting at `initial`
    pub fn new(initial: i64) -> Self {
        Self {
            counter: AtomicI64::new(initial),
        }
    }

    /// Create a clock seeded uniformly from `[1, 100]`
    pub fn with_random_seed() -> Self {
        Self::new(rand::thread_rng().gen_range(SEED_RANGE))
    }

    /// Current counter value
    pub fn current(&self) -> i64 {
        self.counter.load(Ordering::SeqCst)
    }

    /// Advance for an outbound frame and return the frame's timestamp.
    ///
    /// When the increment would reach [`MAX_COUNTER`] the counter restarts at 1.
    pub fn tick(&self) -> i64 {
        self.update(|current| {
            let next = current.saturating_add(1);
            if next >= MAX_COUNTER { 1 } else { next }
        })
    }

    /// Merge a timestamp received from a peer and return the new value.
    ///
    /// The counter becomes `max(current, remote) + 1`.
    pub fn observe(&self, remote: i64) -> i64 {
        self.update(|current| current.max(remote).saturating_add(1))
    }

    fn update(&self, step: impl Fn(i64) -> i64) -> i64 {
        let previous = self
            .counter
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |current| {
                Some(step(current))
            })
            .unwrap_or_else(|current| current);
        step(previous)
    }
}

//! Tick-driven timing primitives.
//!
//! The engine is cooperative and single-threaded: timed work is modelled as
//! state that advances by `dt` each step rather than as threads or futures.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Slack used when deciding a duration has elapsed, to absorb the rounding
/// of summing fixed steps.
pub const TIME_EPSILON: f64 = 1e-9;

/// Shared cancellation flag. Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

/// Counts a duration down by explicit steps.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Countdown {
    remaining_secs: f64,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

impl Countdown {
    pub fn new(secs: f64) -> Self {
        Self {
            remaining_secs: secs.max(0.0),
        }
    }

    /// Advance by `dt`. Returns true once the countdown has elapsed.
    pub fn tick(&mut self, dt: f64) -> bool {
        self.remaining_secs = (self.remaining_secs - dt).max(0.0);
        self.is_elapsed()
    }

    pub fn is_elapsed(&self) -> bool {
        self.remaining_secs <= TIME_EPSILON
    }

    pub fn remaining_secs(&self) -> f64 {
        self.remaining_secs
    }
}

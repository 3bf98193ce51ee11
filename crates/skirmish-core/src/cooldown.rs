//! Turn-based cooldown counter shared by weapons and abilities.

use serde::{Deserialize, Serialize};

/// Remaining turns before a weapon or ability can be used again.
///
/// Decremented by exactly one per turn end and never below zero.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Cooldown {
    remaining: u32,
}

impl Cooldown {
    /// A cooldown that is already ready.
    pub fn ready() -> Self {
        Self::default()
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn is_ready(&self) -> bool {
        self.remaining == 0
    }

    /// Start the cooldown after a use.
    pub fn trigger(&mut self, turns: u32) {
        self.remaining = turns;
    }

    /// Advance one turn. Returns true when this tick made it ready.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn reset(&mut self) {
        self.remaining = 0;
    }

    /// Force an arbitrary remaining count.
    #[cfg(any(test, feature = "test-support"))]
    pub fn force_remaining(&mut self, turns: u32) {
        self.remaining = turns;
    }
}

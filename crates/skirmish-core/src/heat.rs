//! Per-ship heat bookkeeping and tier classification.

use serde::{Deserialize, Serialize};

use crate::constants::REFERENCE_MAX_HEAT;
use crate::enums::HeatTier;

/// Heat carried by a ship.
///
/// `current` only changes at commit points (weapon/ability execution,
/// turn-end dissipation). `planned` is a preview of uncommitted actions.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatState {
    current: f64,
    planned: f64,
    max: f64,
}

/// Lower bounds of each tier above Safe, in absolute heat units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HeatThresholds {
    pub minor: f64,
    pub moderate: f64,
    pub severe: f64,
    pub critical: f64,
    pub catastrophic: f64,
}

impl HeatState {
    pub fn new(max: f64) -> Self {
        Self {
            current: 0.0,
            planned: 0.0,
            max: max.max(0.0),
        }
    }

    pub fn current(&self) -> f64 {
        self.current
    }

    pub fn planned(&self) -> f64 {
        self.planned
    }

    pub fn max(&self) -> f64 {
        self.max
    }

    /// Current plus previewed heat.
    pub fn projected(&self) -> f64 {
        self.current + self.planned
    }

    /// Remove `amount` of current heat, never going below zero.
    /// Returns the heat actually removed.
    pub fn dissipate(&mut self, amount: f64) -> f64 {
        let before = self.current;
        self.current = (self.current - amount.max(0.0)).max(0.0);
        before - self.current
    }

    pub fn add_planned(&mut self, amount: f64) {
        self.planned += amount.max(0.0);
    }

    /// Merge the preview into current heat.
    pub fn commit_planned(&mut self) {
        self.current += self.planned;
        self.planned = 0.0;
    }

    pub fn cancel_planned(&mut self) {
        self.planned = 0.0;
    }

    /// Whether adding `extra` on top of current and planned heat stays within
    /// `factor × max`.
    pub fn fits_under_ceiling(&self, extra: f64, factor: f64) -> bool {
        self.projected() + extra <= self.ceiling(factor)
    }

    pub fn ceiling(&self, factor: f64) -> f64 {
        self.max * factor
    }

    /// Zero current and planned heat.
    pub fn instant_cool(&mut self) {
        self.current = 0.0;
        self.planned = 0.0;
    }

    /// Tier of the current heat against thresholds scaled to this ship's max.
    pub fn tier(&self, reference: &HeatThresholds) -> HeatTier {
        reference.scaled_to(self.max).classify(self.current)
    }

    /// Force current heat directly.
    #[cfg(any(test, feature = "test-support"))]
    pub fn force_current(&mut self, heat: f64) {
        self.current = heat.max(0.0);
    }
}

impl HeatThresholds {
    /// Rescale thresholds defined against the reference max heat.
    pub fn scaled_to(&self, max_heat: f64) -> Self {
        let factor = max_heat / REFERENCE_MAX_HEAT;
        Self {
            minor: self.minor * factor,
            moderate: self.moderate * factor,
            severe: self.severe * factor,
            critical: self.critical * factor,
            catastrophic: self.catastrophic * factor,
        }
    }

    pub fn classify(&self, heat: f64) -> HeatTier {
        if heat < self.minor {
            HeatTier::Safe
        } else if heat < self.moderate {
            HeatTier::Minor
        } else if heat < self.severe {
            HeatTier::Moderate
        } else if heat < self.critical {
            HeatTier::Severe
        } else if heat < self.catastrophic {
            HeatTier::Critical
        } else {
            HeatTier::Catastrophic
        }
    }

    /// Thresholds strictly ascend.
    pub fn is_ascending(&self) -> bool {
        self.minor < self.moderate
            && self.moderate < self.severe
            && self.severe < self.critical
            && self.critical < self.catastrophic
    }
}

impl Default for HeatThresholds {
    fn default() -> Self {
        Self {
            minor: 60.0,
            moderate: 80.0,
            severe: 100.0,
            critical: 120.0,
            catastrophic: 150.0,
        }
    }
}

//! Enumeration types used throughout the simulation.

use serde::{Deserialize, Serialize};

/// Top-level turn phase. Cycles Command → Simulation → TurnEnd → Command.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TurnPhase {
    /// Players plan moves and queue fire commands.
    #[default]
    Command,
    /// Planned actions execute over a timed window.
    Simulation,
    /// Heat, cooldowns and queue cleanup for the completed turn.
    TurnEnd,
}

/// Observational sub-stage of the Simulation phase, derived from progress.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SimulationStage {
    #[default]
    Idle,
    Movement,
    WeaponFiring,
    ProjectileTravel,
    DamageResolution,
    Complete,
}

/// Named heat band, ordered from coolest to hottest.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum HeatTier {
    #[default]
    Safe,
    Minor,
    Moderate,
    Severe,
    Critical,
    Catastrophic,
}

/// Lifecycle of a planned move.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum MoveState {
    /// Plotted during the Command phase, not yet started.
    #[default]
    Planned,
    /// Progressing along its trajectory.
    Executing,
    /// Reached the end of its trajectory.
    Finished,
}

/// Condition reported by the degradation subsystem for one component.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum SubsystemCondition {
    #[default]
    Operational,
    Damaged,
    Destroyed,
}

/// Named weapon group. `None` is group 0.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum WeaponGroup {
    #[default]
    None,
    One,
    Two,
    Three,
    Four,
}

impl WeaponGroup {
    /// Group number as shown to players (0 = none, 1-4 = named groups).
    pub fn number(self) -> u8 {
        match self {
            WeaponGroup::None => 0,
            WeaponGroup::One => 1,
            WeaponGroup::Two => 2,
            WeaponGroup::Three => 3,
            WeaponGroup::Four => 4,
        }
    }

    /// Parse a group number; anything outside 0-4 is rejected.
    pub fn from_number(number: u8) -> Option<Self> {
        match number {
            0 => Some(WeaponGroup::None),
            1 => Some(WeaponGroup::One),
            2 => Some(WeaponGroup::Two),
            3 => Some(WeaponGroup::Three),
            4 => Some(WeaponGroup::Four),
            _ => None,
        }
    }
}

//! Events broadcast by the turn engine for UI and tooling.

use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::types::EntityId;

/// Why a fire intent was refused at queue time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum FireRejection {
    #[error("weapon does not exist")]
    UnknownWeapon,
    #[error("target does not exist")]
    UnknownTarget,
    #[error("firing ship is destroyed")]
    ShipDestroyed,
    #[error("weapon already has a queued command")]
    AlreadyQueued,
    #[error("weapon is cooling down ({remaining} turns left)")]
    CoolingDown { remaining: u32 },
    #[error("weapon is out of ammunition")]
    OutOfAmmo,
    #[error("heat {projected:.1} + {cost:.1} would exceed ceiling {ceiling:.1}")]
    HeatCeiling {
        projected: f64,
        cost: f64,
        ceiling: f64,
    },
}

/// Why a queued command did not fire when its volley came up.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum FireFailure {
    #[error("weapon no longer exists")]
    WeaponMissing,
    #[error("target no longer exists")]
    TargetMissing,
    #[error("target was destroyed")]
    TargetDestroyed,
    #[error("weapon cannot fire")]
    WeaponUnavailable,
    #[error("target is {angle_degrees:.1}° off the mount, outside the arc")]
    OutOfArc { angle_degrees: f64 },
    #[error("target is {distance:.1} away, beyond max range")]
    OutOfRange { distance: f64 },
}

/// Why an ability activation was refused.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, thiserror::Error)]
pub enum AbilityRejection {
    #[error("ship does not exist or has no heat state")]
    UnknownShip,
    #[error("ability slot {slot} does not exist")]
    UnknownSlot { slot: usize },
    #[error("ability is cooling down ({remaining} turns left)")]
    CoolingDown { remaining: u32 },
    #[error("heat {projected:.1} + {cost:.1} would exceed ceiling {ceiling:.1}")]
    HeatCeiling {
        projected: f64,
        cost: f64,
        ceiling: f64,
    },
}

/// Everything the engine broadcasts, in emission order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnEvent {
    // --- Phase flow ---
    TurnStart { turn: u32 },
    CommandPhaseStart,
    SimulationPhaseStart { duration_secs: f64 },
    SimulationProgress { fraction: f64 },
    StageChanged { stage: SimulationStage },
    SimulationPhaseEnd,
    TurnEnd { turn: u32 },

    // --- Fire queue ---
    FireQueued { weapon: EntityId, target: EntityId },
    FireRejected {
        weapon: EntityId,
        reason: FireRejection,
    },
    FireCancelled { weapon: EntityId },
    /// A spin-up group started firing.
    VolleyStarted { spin_up_secs: f64, commands: usize },
    /// Per-command outcome at execution time.
    FireExecuted {
        weapon: EntityId,
        target: EntityId,
        executed: bool,
        failure: Option<FireFailure>,
    },
    /// The spin-up of a fired weapon elapsed; the shot leaves the mount.
    WeaponDischarged { weapon: EntityId, target: EntityId },
    FireBatchComplete { fired: usize, failed: usize },

    // --- Movement ---
    MovementComplete { finished: usize, timed_out: bool },

    // --- Turn-end notifications ---
    HeatDissipated {
        ship: EntityId,
        dissipated: f64,
        passive: f64,
        heat: f64,
    },
    WeaponReady { weapon: EntityId },
    AbilityReady { ship: EntityId, ability: String },

    // --- Abilities ---
    AbilityActivated { ship: EntityId, slot: usize },
    AbilityRejected {
        ship: EntityId,
        slot: usize,
        reason: AbilityRejection,
    },
}

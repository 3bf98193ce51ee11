//! Host commands sent to the turn engine.
//!
//! Commands are buffered and applied at the next step boundary.

use serde::{Deserialize, Serialize};

use crate::enums::WeaponGroup;
use crate::types::{EntityId, Pose};

/// All host-driven turn actions.
///
/// Moves are planned through `TurnEngine::plan_move` instead, because the
/// trajectory is a host-side trait object; `PlanLinearMove` covers the
/// serializable straight-line case.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum TurnCommand {
    // --- Phase control ---
    /// Finish planning and start the Simulation phase.
    EndCommandPhase,
    /// Abandon whatever is running and resolve the turn end now.
    ForceEndTurn,

    // --- Fire planning ---
    QueueFire { weapon: EntityId, target: EntityId },
    QueueGroupFire {
        ship: EntityId,
        group: WeaponGroup,
        target: EntityId,
    },
    QueueAlphaStrike { ship: EntityId, target: EntityId },
    CancelFire { weapon: EntityId },
    ClearFireQueue,

    // --- Movement planning ---
    PlanLinearMove { ship: EntityId, destination: Pose },
    CancelMove { ship: EntityId },

    // --- Abilities ---
    ActivateAbility { ship: EntityId, slot: usize },

    // --- Tooling ---
    InstantCool { ship: EntityId },
    ResetCooldowns { ship: EntityId },
}

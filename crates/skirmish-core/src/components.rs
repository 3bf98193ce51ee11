//! ECS components for hecs entities.
//!
//! Components are plain data. The only behaviour kept here is the handful of
//! resource rules (ammo, readiness, ability ticking) that every caller must
//! apply identically; turn logic lives in the simulation crate's systems.
//! `Pose` (see `types.rs`) and `HeatState` (see `heat.rs`) are used as
//! components too.

use std::fmt;

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

use crate::cooldown::Cooldown;
use crate::enums::*;
use crate::trajectory::Trajectory;
use crate::types::EntityId;

/// Marks an entity as a combat ship.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ship {
    pub name: String,
}

/// Marks a ship as destroyed. Destroyed ships are skipped by turn-end
/// processing and are not valid fire targets.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Destroyed;

/// Marks a ship whose drive is disabled. Immobilized ships do not start
/// planned moves, and a move already executing freezes in place.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct Immobilized;

/// A planned or executing move along a host-supplied trajectory.
pub struct MoveOrder {
    pub trajectory: Box<dyn Trajectory>,
    pub state: MoveState,
    /// Wall-clock length of the move, synced to the Simulation phase.
    pub duration_secs: f64,
    pub elapsed_secs: f64,
}

/// Weapon stats plus its per-turn resource counters.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Weapon {
    pub name: String,
    /// Full cone angle in degrees.
    pub firing_arc_degrees: f64,
    pub max_range: f64,
    /// Delay between the fire order and the shot (seconds).
    pub spin_up_secs: f64,
    pub heat_cost: f64,
    /// Turns of cooldown applied after each shot.
    pub max_cooldown: u32,
    pub cooldown: Cooldown,
    /// `None` means unlimited ammunition.
    pub ammo_capacity: Option<u32>,
    pub ammo: u32,
    pub group: WeaponGroup,
}

/// Where a weapon sits on its ship.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WeaponMount {
    pub ship: EntityId,
    /// Offset from the ship origin in ship-local space.
    pub offset: DVec3,
    /// Mount facing relative to the ship's forward.
    pub facing: DQuat,
}

/// Degradation state read at turn end.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SystemDegradation {
    pub radiators: Vec<SubsystemCondition>,
    /// Heat generated every turn by damaged systems (e.g. a leaking reactor).
    pub passive_heat_per_turn: f64,
}

/// One activatable ability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AbilitySlot {
    pub name: String,
    pub heat_cost: f64,
    pub max_cooldown: u32,
    pub cooldown: Cooldown,
}

/// All abilities fitted to a ship.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AbilitySlots {
    pub slots: Vec<AbilitySlot>,
}

impl MoveOrder {
    pub fn new(trajectory: Box<dyn Trajectory>) -> Self {
        Self {
            trajectory,
            state: MoveState::Planned,
            duration_secs: 0.0,
            elapsed_secs: 0.0,
        }
    }

    /// Normalized progress along the trajectory.
    pub fn progress(&self) -> f64 {
        if self.duration_secs <= 0.0 {
            return match self.state {
                MoveState::Finished => 1.0,
                _ => 0.0,
            };
        }
        (self.elapsed_secs / self.duration_secs).clamp(0.0, 1.0)
    }
}

impl fmt::Debug for MoveOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MoveOrder")
            .field("state", &self.state)
            .field("duration_secs", &self.duration_secs)
            .field("elapsed_secs", &self.elapsed_secs)
            .finish_non_exhaustive()
    }
}

impl Weapon {
    pub fn has_ammo(&self) -> bool {
        self.ammo_capacity.is_none() || self.ammo > 0
    }

    pub fn can_fire(&self) -> bool {
        self.cooldown.is_ready() && self.has_ammo()
    }

    /// Apply the cost of one shot: cooldown and ammunition.
    /// Heat is charged to the owning ship by the caller.
    pub fn discharge(&mut self) {
        self.cooldown.trigger(self.max_cooldown);
        if self.ammo_capacity.is_some() {
            self.ammo = self.ammo.saturating_sub(1);
        }
    }

    pub fn half_arc_degrees(&self) -> f64 {
        self.firing_arc_degrees * 0.5
    }
}

impl AbilitySlots {
    /// Decrement every slot by one turn. Transitions are not reported;
    /// callers that need them inspect the slots beforehand.
    pub fn tick_all_cooldowns(&mut self) {
        for slot in &mut self.slots {
            slot.cooldown.tick();
        }
    }

    /// Names of slots that the next tick will make ready.
    pub fn readying_next_tick(&self) -> Vec<String> {
        self.slots
            .iter()
            .filter(|slot| slot.cooldown.remaining() == 1)
            .map(|slot| slot.name.clone())
            .collect()
    }
}

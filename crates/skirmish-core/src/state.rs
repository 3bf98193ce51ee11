//! Turn snapshot: the complete visible engine state handed to the host each step.

use glam::DVec3;
use serde::{Deserialize, Serialize};

use crate::enums::*;
use crate::events::TurnEvent;
use crate::types::{EntityId, SimTime};

/// Complete engine state produced after each step.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TurnSnapshot {
    pub time: SimTime,
    pub turn: u32,
    pub phase: TurnPhase,
    pub stage: SimulationStage,
    /// Simulation progress in `[0, 1]`; zero outside the Simulation phase.
    pub progress: f64,
    pub fire_queue: FireQueueView,
    pub ships: Vec<ShipView>,
    pub weapons: Vec<WeaponView>,
    /// Events emitted since the previous snapshot, in order.
    pub events: Vec<TurnEvent>,
    pub last_turn_end: Option<TurnEndReport>,
}

/// Fire queue introspection.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FireQueueView {
    pub queued: Vec<QueuedFireView>,
    pub executing: bool,
    pub total_queued_heat: f64,
}

/// One pending fire command.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueuedFireView {
    pub weapon: EntityId,
    pub target: EntityId,
    /// 0 = none, 1-4 = named groups.
    pub group: u8,
    pub alpha_strike: bool,
    pub queued_at: SimTime,
}

/// Ship status for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShipView {
    pub id: EntityId,
    pub name: String,
    pub position: DVec3,
    pub heat: f64,
    pub planned_heat: f64,
    pub max_heat: f64,
    pub heat_tier: HeatTier,
    pub destroyed: bool,
    pub moving: bool,
}

/// Weapon status for display.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeaponView {
    pub id: EntityId,
    pub ship: EntityId,
    pub name: String,
    pub cooldown: u32,
    pub ammo: Option<u32>,
    pub ready: bool,
    pub queued: bool,
}

/// Diagnostic totals from one turn-end resolution.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TurnEndReport {
    /// The turn that was completed.
    pub turn: u32,
    pub ships_processed: usize,
    pub total_dissipation: f64,
    pub total_passive_heat: f64,
    pub weapon_cooldowns_ticked: usize,
    pub ability_cooldowns_ticked: usize,
    pub weapons_ready: usize,
    pub abilities_ready: usize,
}

/// A contiguous stretch of normalized time during which the target is in arc.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FiringWindow {
    pub start: f64,
    pub end: f64,
}

/// Outcome of an arc/range prediction for one weapon against one target.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ArcValidationResult {
    pub will_be_in_arc: bool,
    /// Normalized time with the smallest in-arc angle, if any sample was in arc.
    pub optimal_firing_time: Option<f64>,
    pub min_angle_degrees: f64,
    /// Sorted, non-overlapping windows.
    pub firing_windows: Vec<FiringWindow>,
    pub in_range_at_optimal: bool,
    pub message: String,
}

impl FiringWindow {
    pub fn contains(&self, t: f64) -> bool {
        self.start <= t && t <= self.end
    }
}

impl ArcValidationResult {
    /// In arc and in range at the chosen instant.
    pub fn can_hit(&self) -> bool {
        self.optimal_firing_time.is_some() && self.in_range_at_optimal
    }
}

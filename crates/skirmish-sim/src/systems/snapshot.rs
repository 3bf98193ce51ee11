//! Snapshot system: reads the ECS world and builds a `TurnSnapshot`.
//!
//! Read-only; it never modifies the world.

use hecs::World;

use skirmish_core::components::*;
use skirmish_core::enums::{HeatTier, SimulationStage, TurnPhase};
use skirmish_core::events::TurnEvent;
use skirmish_core::heat::{HeatState, HeatThresholds};
use skirmish_core::state::*;
use skirmish_core::types::{Pose, SimTime};

use crate::ids::to_id;
use crate::systems::fire_queue::FireQueue;
use crate::systems::movement;
use crate::world_setup::ships;

/// Turn-controller fields shown in the snapshot.
#[derive(Debug, Clone, Copy)]
pub struct PhaseView {
    pub turn: u32,
    pub phase: TurnPhase,
    pub stage: SimulationStage,
    pub progress: f64,
}

/// Build a complete snapshot of the engine state.
pub fn build_snapshot(
    world: &World,
    time: &SimTime,
    phase: PhaseView,
    fire_queue: &FireQueue,
    thresholds: &HeatThresholds,
    events: Vec<TurnEvent>,
    last_turn_end: Option<TurnEndReport>,
) -> TurnSnapshot {
    TurnSnapshot {
        time: *time,
        turn: phase.turn,
        phase: phase.phase,
        stage: phase.stage,
        progress: phase.progress,
        fire_queue: fire_queue.view(world),
        ships: build_ships(world, thresholds),
        weapons: build_weapons(world, fire_queue),
        events,
        last_turn_end,
    }
}

fn build_ships(world: &World, thresholds: &HeatThresholds) -> Vec<ShipView> {
    ships(world)
        .into_iter()
        .filter_map(|entity| {
            let ship = world.get::<&Ship>(entity).ok()?;
            let pose = world.get::<&Pose>(entity).ok()?;
            // A ship without heat tracking reads as cold.
            let (heat, planned_heat, max_heat, heat_tier) = match world.get::<&HeatState>(entity) {
                Ok(heat) => (heat.current(), heat.planned(), heat.max(), heat.tier(thresholds)),
                Err(_) => (0.0, 0.0, 0.0, HeatTier::Safe),
            };
            Some(ShipView {
                id: to_id(entity),
                name: ship.name.clone(),
                position: pose.position,
                heat,
                planned_heat,
                max_heat,
                heat_tier,
                destroyed: world.get::<&Destroyed>(entity).is_ok(),
                moving: movement::is_executing_move(world, entity),
            })
        })
        .collect()
}

fn build_weapons(world: &World, fire_queue: &FireQueue) -> Vec<WeaponView> {
    let mut weapons: Vec<WeaponView> = world
        .query::<(&Weapon, &WeaponMount)>()
        .iter()
        .map(|(entity, (weapon, mount))| WeaponView {
            id: to_id(entity),
            ship: mount.ship,
            name: weapon.name.clone(),
            cooldown: weapon.cooldown.remaining(),
            ammo: weapon.ammo_capacity.map(|_| weapon.ammo),
            ready: weapon.can_fire(),
            queued: fire_queue.is_queued(entity),
        })
        .collect();
    weapons.sort_by_key(|w| w.id);
    weapons
}

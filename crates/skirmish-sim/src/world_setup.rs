//! Spawning ships and weapons into the ECS world.

use glam::{DQuat, DVec3};
use hecs::{Entity, World};

use skirmish_core::components::*;
use skirmish_core::constants::REFERENCE_MAX_HEAT;
use skirmish_core::cooldown::Cooldown;
use skirmish_core::enums::{SubsystemCondition, WeaponGroup};
use skirmish_core::heat::HeatState;
use skirmish_core::types::Pose;

use crate::ids::to_id;

/// Everything needed to spawn a ship.
#[derive(Debug, Clone)]
pub struct ShipBlueprint {
    pub name: String,
    pub pose: Pose,
    pub max_heat: f64,
    pub radiators: Vec<SubsystemCondition>,
    pub passive_heat_per_turn: f64,
    /// (name, heat cost, cooldown turns)
    pub abilities: Vec<(String, f64, u32)>,
}

/// Everything needed to mount a weapon on a ship.
#[derive(Debug, Clone)]
pub struct WeaponBlueprint {
    pub name: String,
    pub firing_arc_degrees: f64,
    pub max_range: f64,
    pub spin_up_secs: f64,
    pub heat_cost: f64,
    pub max_cooldown: u32,
    pub ammo_capacity: Option<u32>,
    pub group: WeaponGroup,
    pub offset: DVec3,
    pub facing: DQuat,
}

impl ShipBlueprint {
    /// A ship with reference max heat, two healthy radiators and no abilities.
    pub fn new(name: impl Into<String>, pose: Pose) -> Self {
        Self {
            name: name.into(),
            pose,
            max_heat: REFERENCE_MAX_HEAT,
            radiators: vec![SubsystemCondition::Operational; 2],
            passive_heat_per_turn: 0.0,
            abilities: Vec::new(),
        }
    }
}

impl WeaponBlueprint {
    /// A forward-facing, ungrouped weapon with a 60° arc.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            firing_arc_degrees: 60.0,
            max_range: 500.0,
            spin_up_secs: 0.2,
            heat_cost: 10.0,
            max_cooldown: 1,
            ammo_capacity: None,
            group: WeaponGroup::None,
            offset: DVec3::ZERO,
            facing: DQuat::IDENTITY,
        }
    }
}

pub fn spawn_ship(world: &mut World, blueprint: &ShipBlueprint) -> Entity {
    let abilities = AbilitySlots {
        slots: blueprint
            .abilities
            .iter()
            .map(|(name, heat_cost, max_cooldown)| AbilitySlot {
                name: name.clone(),
                heat_cost: *heat_cost,
                max_cooldown: *max_cooldown,
                cooldown: Cooldown::ready(),
            })
            .collect(),
    };
    world.spawn((
        Ship {
            name: blueprint.name.clone(),
        },
        blueprint.pose,
        HeatState::new(blueprint.max_heat),
        SystemDegradation {
            radiators: blueprint.radiators.clone(),
            passive_heat_per_turn: blueprint.passive_heat_per_turn,
        },
        abilities,
    ))
}

/// Mount a weapon on `ship`. Returns `None` if the ship does not exist.
pub fn spawn_weapon(world: &mut World, ship: Entity, blueprint: &WeaponBlueprint) -> Option<Entity> {
    if world.get::<&Ship>(ship).is_err() {
        return None;
    }
    let weapon = Weapon {
        name: blueprint.name.clone(),
        firing_arc_degrees: blueprint.firing_arc_degrees,
        max_range: blueprint.max_range,
        spin_up_secs: blueprint.spin_up_secs,
        heat_cost: blueprint.heat_cost,
        max_cooldown: blueprint.max_cooldown,
        cooldown: Cooldown::ready(),
        ammo_capacity: blueprint.ammo_capacity,
        ammo: blueprint.ammo_capacity.unwrap_or(0),
        group: blueprint.group,
    };
    let mount = WeaponMount {
        ship: to_id(ship),
        offset: blueprint.offset,
        facing: blueprint.facing,
    };
    Some(world.spawn((weapon, mount)))
}

/// Weapons mounted on `ship`, ordered by entity id.
pub fn weapons_of(world: &World, ship: Entity) -> Vec<Entity> {
    let ship_id = to_id(ship);
    let mut weapons: Vec<Entity> = world
        .query::<&WeaponMount>()
        .iter()
        .filter(|(_, mount)| mount.ship == ship_id)
        .map(|(entity, _)| entity)
        .collect();
    weapons.sort_by_key(|e| e.id());
    weapons
}

/// Ships in spawn order.
pub fn ships(world: &World) -> Vec<Entity> {
    let mut ships: Vec<Entity> = world.query::<&Ship>().iter().map(|(e, _)| e).collect();
    ships.sort_by_key(|e| e.id());
    ships
}

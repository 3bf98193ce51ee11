//! Ability activation gating and resource resets used by tooling.

use hecs::{Entity, World};
use tracing::{debug, info};

use skirmish_core::components::{AbilitySlots, Weapon};
use skirmish_core::events::{AbilityRejection, TurnEvent};
use skirmish_core::heat::HeatState;

use crate::bus::EventBus;
use crate::ids::to_id;
use crate::world_setup::weapons_of;

/// Heat the ceiling check starts from.
#[derive(Debug, Clone, Copy)]
enum Basis {
    /// Current heat only. Activation discards any preview before committing.
    Committed,
    /// Current plus planned heat, so previews stack.
    Projected,
}

/// Cost and cooldown length of an ability that passed its checks.
#[derive(Debug, Clone, Copy)]
struct Cleared {
    cost: f64,
    max_cooldown: u32,
}

/// Activate ability `slot` on `ship`: commit its heat and start its cooldown.
///
/// Activation replaces any previewed heat on the ship, so it is rejected when
/// the slot is cooling down or when current heat plus the cost would exceed
/// the activation ceiling. A rejection leaves all heat untouched.
pub fn activate(
    world: &mut World,
    ship: Entity,
    slot: usize,
    ceiling_factor: f64,
    bus: &mut EventBus,
) -> Result<(), AbilityRejection> {
    let cleared = match check(world, ship, slot, ceiling_factor, Basis::Committed) {
        Ok(cleared) => cleared,
        Err(reason) => {
            debug!(ship = ?to_id(ship), slot, reason = %reason, "ability rejected");
            bus.emit(TurnEvent::AbilityRejected {
                ship: to_id(ship),
                slot,
                reason: reason.clone(),
            });
            return Err(reason);
        }
    };

    if let Ok(mut heat) = world.get::<&mut HeatState>(ship) {
        heat.cancel_planned();
        heat.add_planned(cleared.cost);
        heat.commit_planned();
    }
    if let Ok(mut slots) = world.get::<&mut AbilitySlots>(ship) {
        if let Some(s) = slots.slots.get_mut(slot) {
            s.cooldown.trigger(cleared.max_cooldown);
        }
    }

    info!(ship = ?to_id(ship), slot, cost = cleared.cost, "ability activated");
    bus.emit(TurnEvent::AbilityActivated {
        ship: to_id(ship),
        slot,
    });
    Ok(())
}

/// Show an ability's heat as planned heat without committing it.
/// Previews stack, so the ceiling is checked against current plus planned
/// heat. Returns the projected heat.
pub fn preview(
    world: &mut World,
    ship: Entity,
    slot: usize,
    ceiling_factor: f64,
) -> Result<f64, AbilityRejection> {
    let cleared = check(world, ship, slot, ceiling_factor, Basis::Projected)?;
    let mut heat = world
        .get::<&mut HeatState>(ship)
        .map_err(|_| AbilityRejection::UnknownShip)?;
    heat.add_planned(cleared.cost);
    Ok(heat.projected())
}

/// Drop any previewed heat on `ship`. Returns false for unknown ships.
pub fn cancel_preview(world: &mut World, ship: Entity) -> bool {
    match world.get::<&mut HeatState>(ship) {
        Ok(mut heat) => {
            heat.cancel_planned();
            true
        }
        Err(_) => false,
    }
}

/// Drop previewed heat on every ship.
pub fn cancel_all_previews(world: &mut World) {
    for (_entity, heat) in world.query_mut::<&mut HeatState>() {
        heat.cancel_planned();
    }
}

/// Zero current and planned heat.
pub fn instant_cool(world: &mut World, ship: Entity) -> bool {
    match world.get::<&mut HeatState>(ship) {
        Ok(mut heat) => {
            heat.instant_cool();
            info!(ship = ?to_id(ship), "instant cool");
            true
        }
        Err(_) => false,
    }
}

/// Make every weapon and ability on `ship` ready.
pub fn reset_cooldowns(world: &mut World, ship: Entity) -> bool {
    let Ok(mut slots) = world.get::<&mut AbilitySlots>(ship) else {
        return false;
    };
    for slot in &mut slots.slots {
        slot.cooldown.reset();
    }
    drop(slots);

    for weapon in weapons_of(world, ship) {
        if let Ok(mut w) = world.get::<&mut Weapon>(weapon) {
            w.cooldown.reset();
        }
    }
    info!(ship = ?to_id(ship), "cooldowns reset");
    true
}

fn check(
    world: &World,
    ship: Entity,
    slot: usize,
    ceiling_factor: f64,
    basis: Basis,
) -> Result<Cleared, AbilityRejection> {
    let heat = *world
        .get::<&HeatState>(ship)
        .map_err(|_| AbilityRejection::UnknownShip)?;
    let slots = world
        .get::<&AbilitySlots>(ship)
        .map_err(|_| AbilityRejection::UnknownShip)?;
    let ability = slots
        .slots
        .get(slot)
        .ok_or(AbilityRejection::UnknownSlot { slot })?;

    if !ability.cooldown.is_ready() {
        return Err(AbilityRejection::CoolingDown {
            remaining: ability.cooldown.remaining(),
        });
    }
    let base = match basis {
        Basis::Committed => heat.current(),
        Basis::Projected => heat.projected(),
    };
    let ceiling = heat.ceiling(ceiling_factor);
    if base + ability.heat_cost > ceiling {
        return Err(AbilityRejection::HeatCeiling {
            projected: base,
            cost: ability.heat_cost,
            ceiling,
        });
    }
    Ok(Cleared {
        cost: ability.heat_cost,
        max_cooldown: ability.max_cooldown,
    })
}

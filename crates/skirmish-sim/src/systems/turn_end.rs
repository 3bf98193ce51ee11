//! Turn-end resolution: heat dissipation, passive heat, weapon and ability
//! cooldowns. Runs once per completed turn.

use hecs::{Entity, World};
use tracing::{debug, info, warn};

use skirmish_core::components::{AbilitySlots, Destroyed, SystemDegradation, Weapon};
use skirmish_core::config::HeatConfig;
use skirmish_core::enums::SubsystemCondition;
use skirmish_core::events::TurnEvent;
use skirmish_core::heat::HeatState;
use skirmish_core::state::TurnEndReport;

use crate::bus::EventBus;
use crate::ids::to_id;
use crate::world_setup::{ships, weapons_of};

/// Keeps the totals of the most recent resolution for diagnostics.
#[derive(Debug, Default)]
pub struct TurnEndResolver {
    last_report: Option<TurnEndReport>,
    turns_resolved: u32,
}

impl TurnEndResolver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the end of `turn` for every non-destroyed ship, in spawn order.
    pub fn resolve(
        &mut self,
        world: &mut World,
        heat: &HeatConfig,
        turn: u32,
        bus: &mut EventBus,
    ) -> TurnEndReport {
        let mut report = TurnEndReport {
            turn,
            ..Default::default()
        };

        let all_ships = ships(world);
        if all_ships.is_empty() {
            warn!(turn, "no ships registered, turn end does nothing");
        }

        for ship in all_ships {
            if world.get::<&Destroyed>(ship).is_ok() {
                continue;
            }
            report.ships_processed += 1;
            resolve_heat(world, ship, heat, &mut report, bus);
            resolve_weapon_cooldowns(world, ship, &mut report, bus);
            resolve_ability_cooldowns(world, ship, &mut report, bus);
        }

        info!(
            turn,
            ships = report.ships_processed,
            dissipation = report.total_dissipation,
            weapons_ready = report.weapons_ready,
            abilities_ready = report.abilities_ready,
            "turn end resolved"
        );
        self.turns_resolved += 1;
        self.last_report = Some(report.clone());
        report
    }

    pub fn last_report(&self) -> Option<&TurnEndReport> {
        self.last_report.as_ref()
    }

    pub fn turns_resolved(&self) -> u32 {
        self.turns_resolved
    }
}

/// Base rate plus each radiator's bonus: full when operational, half when
/// damaged, none when destroyed.
pub fn dissipation_rate(config: &HeatConfig, radiators: &[SubsystemCondition]) -> f64 {
    config.base_dissipation
        + radiators
            .iter()
            .map(|condition| match condition {
                SubsystemCondition::Operational => config.radiator_bonus,
                SubsystemCondition::Damaged => config.radiator_bonus * 0.5,
                SubsystemCondition::Destroyed => 0.0,
            })
            .sum::<f64>()
}

fn resolve_heat(
    world: &mut World,
    ship: Entity,
    config: &HeatConfig,
    report: &mut TurnEndReport,
    bus: &mut EventBus,
) {
    let (rate, passive) = match world.get::<&SystemDegradation>(ship) {
        Ok(degradation) => (
            dissipation_rate(config, &degradation.radiators),
            degradation.passive_heat_per_turn.max(0.0),
        ),
        Err(_) => (config.base_dissipation, 0.0),
    };
    let Ok(mut heat) = world.get::<&mut HeatState>(ship) else {
        return;
    };

    // Cooling first, then this turn's passive generation.
    heat.cancel_planned();
    let before = heat.current();
    let dissipated = heat.dissipate(rate);
    if passive > 0.0 {
        heat.add_planned(passive);
        heat.commit_planned();
    }
    let after = heat.current();

    report.total_dissipation += dissipated;
    report.total_passive_heat += passive;

    if (after - before).abs() > config.notify_epsilon {
        debug!(ship = ?to_id(ship), dissipated, passive, heat = after, "heat dissipated");
        bus.emit(TurnEvent::HeatDissipated {
            ship: to_id(ship),
            dissipated,
            passive,
            heat: after,
        });
    }
}

fn resolve_weapon_cooldowns(
    world: &mut World,
    ship: Entity,
    report: &mut TurnEndReport,
    bus: &mut EventBus,
) {
    for weapon in weapons_of(world, ship) {
        let Ok(mut w) = world.get::<&mut Weapon>(weapon) else {
            continue;
        };
        report.weapon_cooldowns_ticked += 1;
        if w.cooldown.tick() {
            report.weapons_ready += 1;
            bus.emit(TurnEvent::WeaponReady {
                weapon: to_id(weapon),
            });
        }
    }
}

fn resolve_ability_cooldowns(
    world: &mut World,
    ship: Entity,
    report: &mut TurnEndReport,
    bus: &mut EventBus,
) {
    let Ok(mut slots) = world.get::<&mut AbilitySlots>(ship) else {
        return;
    };
    // The batch tick does not report transitions, so look ahead first.
    let readying = slots.readying_next_tick();
    slots.tick_all_cooldowns();
    report.ability_cooldowns_ticked += slots.slots.len();
    for ability in readying {
        report.abilities_ready += 1;
        bus.emit(TurnEvent::AbilityReady {
            ship: to_id(ship),
            ability,
        });
    }
}

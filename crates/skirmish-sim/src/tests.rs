//! Tests for the turn engine: phase flow, volleys, two-phase validation,
//! movement, turn-end resolution and prediction properties.

use std::sync::{Arc, Mutex};

use glam::{DQuat, DVec3};
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

use skirmish_core::commands::TurnCommand;
use skirmish_core::components::{Immobilized, MoveOrder, Weapon};
use skirmish_core::config::SkirmishConfig;
use skirmish_core::enums::*;
use skirmish_core::events::{AbilityRejection, FireFailure, FireRejection, TurnEvent};
use skirmish_core::heat::HeatState;
use skirmish_core::state::FiringWindow;
use skirmish_core::trajectory::{LinearTrajectory, Trajectory};
use skirmish_core::types::{EntityId, Pose};

use crate::bus::{SharedSubscriber, TurnEventSubscriber};
use crate::error::TurnError;
use crate::ids::from_id;
use crate::systems::arc_prediction;
use crate::world_setup::{ShipBlueprint, WeaponBlueprint};
use crate::TurnEngine;

const MAX_STEPS: usize = 1000;

// ---- Helpers ----

fn ship_at(engine: &mut TurnEngine, name: &str, position: DVec3) -> EntityId {
    engine.spawn_ship(&ShipBlueprint::new(name, Pose::at(position)))
}

fn weapon_on(engine: &mut TurnEngine, ship: EntityId, blueprint: WeaponBlueprint) -> EntityId {
    engine.spawn_weapon(ship, &blueprint).unwrap()
}

fn with_weapon<R>(engine: &mut TurnEngine, weapon: EntityId, f: impl FnOnce(&mut Weapon) -> R) -> R {
    let e = from_id(weapon).unwrap();
    let mut w = engine.world_mut().get::<&mut Weapon>(e).unwrap();
    f(&mut w)
}

fn force_heat(engine: &mut TurnEngine, ship: EntityId, heat: f64) {
    let e = from_id(ship).unwrap();
    engine
        .world_mut()
        .get::<&mut HeatState>(e)
        .unwrap()
        .force_current(heat);
}

fn pose_of(engine: &TurnEngine, ship: EntityId) -> Pose {
    *engine.world().get::<&Pose>(from_id(ship).unwrap()).unwrap()
}

/// End the Command phase through the command queue and tick until the next
/// turn begins. Returns every event tagged with the step it surfaced on.
fn run_turn(engine: &mut TurnEngine) -> Vec<(usize, TurnEvent)> {
    engine.queue_command(TurnCommand::EndCommandPhase);
    let start_turn = engine.turn();
    let mut events = Vec::new();
    for step in 0..MAX_STEPS {
        let snapshot = engine.tick();
        events.extend(snapshot.events.into_iter().map(|e| (step, e)));
        if engine.turn() > start_turn {
            return events;
        }
    }
    panic!("turn {start_turn} never completed");
}

fn step_of(events: &[(usize, TurnEvent)], pred: impl Fn(&TurnEvent) -> bool) -> Option<usize> {
    events.iter().find(|(_, e)| pred(e)).map(|(step, _)| *step)
}

fn index_of(events: &[(usize, TurnEvent)], pred: impl Fn(&TurnEvent) -> bool) -> Option<usize> {
    events.iter().position(|(_, e)| pred(e))
}

/// Target circling the origin at radius 100: bearing 0° → `sweep` over the turn.
struct Orbit {
    sweep_degrees: f64,
}

impl Trajectory for Orbit {
    fn position_at(&self, t: f64) -> DVec3 {
        let bearing = (self.sweep_degrees * t).to_radians();
        DVec3::new(bearing.sin(), 0.0, bearing.cos()) * 100.0
    }

    fn rotation_at(&self, _t: f64) -> DQuat {
        DQuat::IDENTITY
    }
}

#[derive(Default)]
struct PhaseLog {
    entries: Vec<String>,
    fractions: Vec<f64>,
}

impl TurnEventSubscriber for PhaseLog {
    fn on_turn_start(&mut self, turn: u32) {
        self.entries.push(format!("turn_start {turn}"));
    }

    fn on_command_phase_start(&mut self) {
        self.entries.push("command".into());
    }

    fn on_simulation_phase_start(&mut self, _duration_secs: f64) {
        self.entries.push("sim_start".into());
    }

    fn on_simulation_progress(&mut self, fraction: f64) {
        self.fractions.push(fraction);
    }

    fn on_simulation_phase_end(&mut self) {
        self.entries.push("sim_end".into());
    }

    fn on_turn_end(&mut self, completed_turn: u32) {
        self.entries.push(format!("turn_end {completed_turn}"));
    }
}

// ---- Phase flow ----

#[test]
fn test_first_tick_opens_turn_one() {
    let mut engine = TurnEngine::default();
    let snapshot = engine.tick();
    assert_eq!(snapshot.turn, 1);
    assert_eq!(snapshot.phase, TurnPhase::Command);
    assert_eq!(
        snapshot.events,
        vec![TurnEvent::TurnStart { turn: 1 }, TurnEvent::CommandPhaseStart]
    );
    assert!(engine.tick().events.is_empty(), "turn start is broadcast once");
}

#[test]
fn test_command_phase_waits_for_host() {
    let mut engine = TurnEngine::default();
    for _ in 0..300 {
        engine.tick();
    }
    assert_eq!(engine.phase(), TurnPhase::Command);
    assert_eq!(engine.turn(), 1);
}

#[test]
fn test_simulation_runs_for_configured_duration() {
    let mut config = SkirmishConfig::default();
    config.turn.simulation_duration_secs = 1.0;
    let mut engine = TurnEngine::new(config);
    ship_at(&mut engine, "Solo", DVec3::ZERO);
    engine.tick();

    let events = run_turn(&mut engine);
    let end = step_of(&events, |e| matches!(e, TurnEvent::TurnEnd { .. })).unwrap();
    assert_eq!(end, 29, "1 s at 30 Hz ends on the 30th step");
    assert_eq!(engine.turn(), 2);
}

#[test]
fn test_subscriber_sees_phase_order() {
    let mut engine = TurnEngine::default();
    let log = Arc::new(Mutex::new(PhaseLog::default()));
    let handle: SharedSubscriber = log.clone();
    assert!(engine.subscribe(handle.clone()));
    assert!(!engine.subscribe(handle), "second subscribe is a no-op");
    ship_at(&mut engine, "Solo", DVec3::ZERO);

    run_turn(&mut engine);

    let log = log.lock().unwrap();
    assert_eq!(
        log.entries,
        vec![
            "turn_start 1",
            "command",
            "sim_start",
            "sim_end",
            "turn_end 1",
            "turn_start 2",
            "command",
        ]
    );
    assert!(log.fractions.windows(2).all(|w| w[0] <= w[1]));
    assert_eq!(log.fractions.first().copied(), Some(0.0));
    assert_eq!(log.fractions.last().copied(), Some(1.0));
}

#[test]
fn test_late_subscriber_waits_for_next_cycle() {
    let mut engine = TurnEngine::default();
    ship_at(&mut engine, "Solo", DVec3::ZERO);
    engine.tick();
    engine.end_command_phase().unwrap();

    let log = Arc::new(Mutex::new(PhaseLog::default()));
    engine.subscribe(log.clone());
    for _ in 0..MAX_STEPS {
        engine.tick();
        if engine.turn() == 2 {
            break;
        }
    }

    let log = log.lock().unwrap();
    assert!(!log.entries.contains(&"sim_start".to_string()));
    assert!(!log.entries.contains(&"turn_start 1".to_string()));
    assert_eq!(
        log.entries,
        vec!["sim_end", "turn_end 1", "turn_start 2", "command"]
    );
}

#[test]
fn test_stage_changes_are_broadcast() {
    let mut engine = TurnEngine::default();
    ship_at(&mut engine, "Solo", DVec3::ZERO);
    let stages: Vec<SimulationStage> = run_turn(&mut engine)
        .into_iter()
        .filter_map(|(_, e)| match e {
            TurnEvent::StageChanged { stage } => Some(stage),
            _ => None,
        })
        .collect();
    assert_eq!(
        stages,
        vec![
            SimulationStage::Movement,
            SimulationStage::WeaponFiring,
            SimulationStage::ProjectileTravel,
            SimulationStage::DamageResolution,
            SimulationStage::Complete,
        ]
    );
    assert_eq!(engine.stage(), SimulationStage::Idle);
}

#[test]
fn test_wrong_phase_is_refused() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));
    engine.end_command_phase().unwrap();

    let expected = TurnError::WrongPhase {
        expected: TurnPhase::Command,
        actual: TurnPhase::Simulation,
    };
    assert_eq!(engine.queue_fire(weapon, target), Err(expected.clone()));
    assert_eq!(engine.end_command_phase(), Err(expected.clone()));
    assert_eq!(
        engine.plan_linear_move(shooter, Pose::at(DVec3::X)),
        Err(expected)
    );
}

#[test]
fn test_unknown_ids_are_rejected_not_panicking() {
    let mut engine = TurnEngine::default();
    let target = ship_at(&mut engine, "Target", DVec3::ZERO);
    assert_eq!(
        engine.queue_fire(EntityId(0), target),
        Err(TurnError::Fire(FireRejection::UnknownWeapon))
    );
    assert_eq!(
        engine.instant_cool(EntityId(0)),
        Err(TurnError::UnknownEntity(EntityId(0)))
    );
    assert!(engine.predict_arc(EntityId(0), target).optimal_firing_time.is_none());
}

#[test]
fn test_empty_world_turns_still_cycle() {
    let mut engine = TurnEngine::default();
    engine.tick();
    let events = run_turn(&mut engine);
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::MovementComplete { finished: 0, timed_out: false }));
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::FireBatchComplete { fired: 0, failed: 0 }));
    assert_eq!(engine.last_turn_end().unwrap().ships_processed, 0);
}

// ---- Cooldowns and heat ----

#[test]
fn test_weapon_cooldown_cycle_across_turns() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            max_cooldown: 3,
            ..WeaponBlueprint::new("Lance")
        },
    );

    engine.queue_fire(weapon, target).unwrap();
    run_turn(&mut engine);
    // Fired (3) then ticked once at the end of the turn.
    assert_eq!(with_weapon(&mut engine, weapon, |w| w.cooldown.remaining()), 2);
    assert_eq!(
        engine.queue_fire(weapon, target),
        Err(TurnError::Fire(FireRejection::CoolingDown { remaining: 2 }))
    );

    run_turn(&mut engine);
    let events = run_turn(&mut engine);
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::WeaponReady { weapon }));
    assert!(with_weapon(&mut engine, weapon, |w| w.can_fire()));
    assert!(engine.queue_fire(weapon, target).is_ok());
}

#[test]
fn test_heat_ceiling_rejects_weapon_without_preview() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            heat_cost: 15.0,
            ..WeaponBlueprint::new("Lance")
        },
    );
    force_heat(&mut engine, shooter, 290.0);

    assert_eq!(
        engine.queue_fire(weapon, target),
        Err(TurnError::Fire(FireRejection::HeatCeiling {
            projected: 290.0,
            cost: 15.0,
            ceiling: 300.0,
        }))
    );
    let heat = engine.heat(shooter).unwrap();
    assert_eq!(heat.planned(), 0.0);
    assert_eq!(heat.current(), 290.0);
    assert_eq!(engine.fire_queue().queued_count(), 0);
}

#[test]
fn test_heat_ceiling_rejects_ability() {
    let mut engine = TurnEngine::default();
    let mut bp = ShipBlueprint::new("Ship", Pose::default());
    bp.abilities = vec![("Overdrive".to_string(), 15.0, 2)];
    let ship = engine.spawn_ship(&bp);
    force_heat(&mut engine, ship, 290.0);

    let result = engine.activate_ability(ship, 0);
    assert!(matches!(
        result,
        Err(TurnError::Ability(AbilityRejection::HeatCeiling { .. }))
    ));
    assert_eq!(engine.heat(ship).unwrap().planned(), 0.0);
}

#[test]
fn test_ability_cooldown_ready_notification() {
    let mut engine = TurnEngine::default();
    let mut bp = ShipBlueprint::new("Ship", Pose::default());
    bp.abilities = vec![("Overdrive".to_string(), 15.0, 2)];
    let ship = engine.spawn_ship(&bp);
    engine.tick();
    engine.activate_ability(ship, 0).unwrap();
    assert_eq!(engine.heat(ship).unwrap().current(), 15.0);

    let first = run_turn(&mut engine);
    assert!(!first
        .iter()
        .any(|(_, e)| matches!(e, TurnEvent::AbilityReady { .. })));
    let second = run_turn(&mut engine);
    assert!(second.iter().any(|(_, e)| *e
        == TurnEvent::AbilityReady {
            ship,
            ability: "Overdrive".to_string(),
        }));
    assert!(engine.activate_ability(ship, 0).is_ok());
}

#[test]
fn test_preview_cleared_when_simulation_starts() {
    let mut engine = TurnEngine::default();
    let mut bp = ShipBlueprint::new("Ship", Pose::default());
    bp.abilities = vec![("Overdrive".to_string(), 15.0, 2)];
    let ship = engine.spawn_ship(&bp);
    assert_eq!(engine.preview_ability(ship, 0), Ok(15.0));
    assert!(engine.cancel_heat_preview(ship));
    assert_eq!(engine.heat(ship).unwrap().planned(), 0.0);

    assert_eq!(engine.preview_ability(ship, 0), Ok(15.0));
    assert_eq!(engine.heat(ship).unwrap().planned(), 15.0);
    engine.end_command_phase().unwrap();
    assert_eq!(engine.heat(ship).unwrap().planned(), 0.0);
    assert_eq!(engine.heat(ship).unwrap().current(), 0.0);
}

#[test]
fn test_turn_end_dissipation_and_passive_heat() {
    let mut engine = TurnEngine::default();
    let mut bp = ShipBlueprint::new("Leaky", Pose::default());
    bp.radiators = vec![SubsystemCondition::Operational, SubsystemCondition::Damaged];
    bp.passive_heat_per_turn = 3.0;
    let ship = engine.spawn_ship(&bp);
    force_heat(&mut engine, ship, 100.0);

    let events = run_turn(&mut engine);
    // 100 - (10 + 5 + 2.5) + 3
    assert!((engine.heat(ship).unwrap().current() - 85.5).abs() < 1e-9);
    assert!(events.iter().any(|(_, e)| matches!(
        e,
        TurnEvent::HeatDissipated { ship: s, passive, .. } if *s == ship && *passive == 3.0
    )));
    let report = engine.last_turn_end().unwrap();
    assert_eq!(report.turn, 1);
    assert!((report.total_dissipation - 17.5).abs() < 1e-9);
}

#[test]
fn test_heat_tier_scales_with_max_heat() {
    let mut engine = TurnEngine::default();
    let small = engine.spawn_ship(&ShipBlueprint::new("Small", Pose::default()));
    let mut big_bp = ShipBlueprint::new("Big", Pose::default());
    big_bp.max_heat = 300.0;
    let big = engine.spawn_ship(&big_bp);
    force_heat(&mut engine, small, 100.0);
    force_heat(&mut engine, big, 100.0);

    assert_eq!(engine.heat_tier(small), Some(HeatTier::Severe));
    assert_eq!(engine.heat_tier(big), Some(HeatTier::Safe));

    let snapshot = engine.tick();
    let tiers: Vec<HeatTier> = snapshot.ships.iter().map(|s| s.heat_tier).collect();
    assert_eq!(tiers, vec![HeatTier::Severe, HeatTier::Safe]);
}

#[test]
fn test_ship_without_heat_state_reads_safe() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "Hulk", DVec3::ZERO);
    engine
        .world_mut()
        .remove_one::<HeatState>(from_id(ship).unwrap())
        .unwrap();

    let snapshot = engine.tick();
    let view = &snapshot.ships[0];
    assert_eq!(view.heat_tier, HeatTier::Safe);
    assert_eq!(view.heat, 0.0);
    assert_eq!(view.max_heat, 0.0);
}

#[test]
fn test_tooling_resets() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "Ship", DVec3::ZERO);
    let weapon = weapon_on(&mut engine, ship, WeaponBlueprint::new("Lance"));
    with_weapon(&mut engine, weapon, |w| w.cooldown.force_remaining(4));
    force_heat(&mut engine, ship, 140.0);

    engine.queue_commands([
        TurnCommand::InstantCool { ship },
        TurnCommand::ResetCooldowns { ship },
    ]);
    engine.tick();

    assert_eq!(engine.heat(ship).unwrap().current(), 0.0);
    assert!(with_weapon(&mut engine, weapon, |w| w.cooldown.is_ready()));
}

// ---- Fire execution ----

#[test]
fn test_volleys_fire_fastest_spin_up_first() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let slow = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            spin_up_secs: 0.5,
            ..WeaponBlueprint::new("Slow")
        },
    );
    let fast = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            spin_up_secs: 0.2,
            ..WeaponBlueprint::new("Fast")
        },
    );
    // Queue order is deliberately the reverse of the expected firing order.
    engine.queue_fire(slow, target).unwrap();
    engine.queue_fire(fast, target).unwrap();

    let events = run_turn(&mut engine);
    let fast_volley = index_of(&events, |e| {
        matches!(e, TurnEvent::VolleyStarted { spin_up_secs, .. } if *spin_up_secs == 0.2)
    })
    .unwrap();
    let slow_volley = index_of(&events, |e| {
        matches!(e, TurnEvent::VolleyStarted { spin_up_secs, .. } if *spin_up_secs == 0.5)
    })
    .unwrap();
    let fast_fired = index_of(&events, |e| {
        matches!(e, TurnEvent::FireExecuted { weapon, executed: true, .. } if *weapon == fast)
    })
    .unwrap();
    let slow_fired = index_of(&events, |e| {
        matches!(e, TurnEvent::FireExecuted { weapon, executed: true, .. } if *weapon == slow)
    })
    .unwrap();
    assert!(fast_volley < fast_fired && fast_fired < slow_volley && slow_volley < slow_fired);

    // The second volley waits out the first volley's spin-up plus the margin.
    let gap = events[slow_volley].0 - events[fast_volley].0;
    assert!(gap >= 8, "second volley started only {gap} steps after the first");

    let discharged: Vec<EntityId> = events
        .iter()
        .filter_map(|(_, e)| match e {
            TurnEvent::WeaponDischarged { weapon, .. } => Some(*weapon),
            _ => None,
        })
        .collect();
    assert_eq!(discharged, vec![fast, slow]);
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::FireBatchComplete { fired: 2, failed: 0 }));
}

#[test]
fn test_equal_spin_ups_share_a_volley() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    for (name, spin_up) in [("A", 0.3), ("B", 0.1 + 0.2)] {
        weapon_on(
            &mut engine,
            shooter,
            WeaponBlueprint {
                spin_up_secs: spin_up,
                ..WeaponBlueprint::new(name)
            },
        );
    }
    assert_eq!(engine.queue_alpha_strike(shooter, target), Ok(2));

    let events = run_turn(&mut engine);
    let volleys: Vec<usize> = events
        .iter()
        .filter_map(|(_, e)| match e {
            TurnEvent::VolleyStarted { commands, .. } => Some(*commands),
            _ => None,
        })
        .collect();
    assert_eq!(volleys, vec![2]);
}

#[test]
fn test_target_leaving_arc_fails_at_execution() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 100.0));
    let early = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            spin_up_secs: 0.6,
            max_range: 2000.0,
            ..WeaponBlueprint::new("Early")
        },
    );
    let late = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            spin_up_secs: 0.9,
            max_range: 2000.0,
            ..WeaponBlueprint::new("Late")
        },
    );
    engine
        .plan_linear_move(target, Pose::at(DVec3::new(1000.0, 0.0, 100.0)))
        .unwrap();

    // Both pass the queue-time checks: arc is not considered there.
    engine.queue_fire(early, target).unwrap();
    engine.queue_fire(late, target).unwrap();

    // Prediction already shows the target sliding out of the arc early on.
    let prediction = engine.predict_arc(late, target);
    assert!(prediction.will_be_in_arc);
    assert_eq!(prediction.optimal_firing_time, Some(0.0));
    assert_eq!(
        prediction.firing_windows,
        vec![FiringWindow { start: 0.0, end: 0.1 }]
    );

    let events = run_turn(&mut engine);
    assert!(events.iter().any(|(_, e)| *e
        == TurnEvent::FireExecuted {
            weapon: early,
            target,
            executed: true,
            failure: None,
        }));
    let late_outcome = events
        .iter()
        .find_map(|(_, e)| match e {
            TurnEvent::FireExecuted { weapon, failure, executed, .. } if *weapon == late => {
                Some((*executed, failure.clone()))
            }
            _ => None,
        })
        .unwrap();
    assert!(!late_outcome.0);
    assert!(
        matches!(late_outcome.1, Some(FireFailure::OutOfArc { angle_degrees }) if angle_degrees > 30.0)
    );
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::FireBatchComplete { fired: 1, failed: 1 }));
    assert!(with_weapon(&mut engine, late, |w| w.cooldown.is_ready()));
}

#[test]
fn test_destroyed_target_fails_without_blocking_batch() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let doomed = ship_at(&mut engine, "Doomed", DVec3::new(0.0, 0.0, 200.0));
    let other = ship_at(&mut engine, "Other", DVec3::new(0.0, 0.0, 300.0));
    let a = weapon_on(&mut engine, shooter, WeaponBlueprint::new("A"));
    let b = weapon_on(&mut engine, shooter, WeaponBlueprint::new("B"));
    engine.queue_fire(a, doomed).unwrap();
    engine.queue_fire(b, other).unwrap();
    engine
        .world_mut()
        .insert_one(from_id(doomed).unwrap(), skirmish_core::components::Destroyed)
        .unwrap();

    let events = run_turn(&mut engine);
    assert!(events.iter().any(|(_, e)| *e
        == TurnEvent::FireExecuted {
            weapon: a,
            target: doomed,
            executed: false,
            failure: Some(FireFailure::TargetDestroyed),
        }));
    assert!(events.iter().any(|(_, e)| *e
        == TurnEvent::FireExecuted {
            weapon: b,
            target: other,
            executed: true,
            failure: None,
        }));
}

#[test]
fn test_unexecuted_commands_do_not_carry_over() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));
    engine.queue_fire(weapon, target).unwrap();
    engine.force_end_turn().unwrap();
    assert_eq!(engine.fire_queue().queued_count(), 0);
    assert!(with_weapon(&mut engine, weapon, |w| w.cooldown.is_ready()));
}

#[test]
fn test_snapshot_reports_queue() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            group: WeaponGroup::One,
            ..WeaponBlueprint::new("A")
        },
    );
    weapon_on(&mut engine, shooter, WeaponBlueprint::new("B"));
    engine.queue_command(TurnCommand::QueueGroupFire {
        ship: shooter,
        group: WeaponGroup::One,
        target,
    });

    let snapshot = engine.tick();
    assert_eq!(snapshot.fire_queue.queued.len(), 1);
    assert_eq!(snapshot.fire_queue.queued[0].group, 1);
    assert!(!snapshot.fire_queue.executing);
    assert_eq!(snapshot.fire_queue.total_queued_heat, 10.0);
    assert_eq!(snapshot.weapons.iter().filter(|w| w.queued).count(), 1);

    let json = serde_json::to_string(&snapshot).unwrap();
    assert!(json.contains("FireQueued"));
}

// ---- Movement ----

#[test]
fn test_moves_finish_together_at_destination() {
    let mut engine = TurnEngine::default();
    let a = ship_at(&mut engine, "A", DVec3::ZERO);
    let b = ship_at(&mut engine, "B", DVec3::new(100.0, 0.0, 0.0));
    engine
        .plan_linear_move(a, Pose::at(DVec3::new(0.0, 0.0, 300.0)))
        .unwrap();
    engine
        .plan_linear_move(b, Pose::at(DVec3::new(100.0, 0.0, 50.0)))
        .unwrap();

    let events = run_turn(&mut engine);
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::MovementComplete { finished: 2, timed_out: false }));
    let complete = index_of(&events, |e| matches!(e, TurnEvent::MovementComplete { .. })).unwrap();
    let phase_end = index_of(&events, |e| *e == TurnEvent::SimulationPhaseEnd).unwrap();
    assert!(complete < phase_end);

    assert!((pose_of(&engine, a).position - DVec3::new(0.0, 0.0, 300.0)).length() < 1e-6);
    assert!((pose_of(&engine, b).position - DVec3::new(100.0, 0.0, 50.0)).length() < 1e-6);
    assert!(engine
        .world()
        .get::<&MoveOrder>(from_id(a).unwrap())
        .is_err());
}

#[test]
fn test_movement_progresses_mid_phase() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "A", DVec3::ZERO);
    engine
        .plan_linear_move(ship, Pose::at(DVec3::new(0.0, 0.0, 300.0)))
        .unwrap();
    engine.queue_command(TurnCommand::EndCommandPhase);
    let mut snapshot = engine.tick();
    for _ in 1..45 {
        snapshot = engine.tick();
    }
    // 45 of 90 steps.
    let z = pose_of(&engine, ship).position.z;
    assert!((z - 150.0).abs() < 1e-6, "z = {z}");
    assert!(snapshot.ships[0].moving);
    assert!(engine.is_moving());
}

#[test]
fn test_frozen_mover_times_out_instead_of_hanging() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "A", DVec3::ZERO);
    engine
        .plan_linear_move(ship, Pose::at(DVec3::new(0.0, 0.0, 300.0)))
        .unwrap();
    engine.queue_command(TurnCommand::EndCommandPhase);
    for _ in 0..10 {
        engine.tick();
    }
    engine
        .world_mut()
        .insert_one(from_id(ship).unwrap(), Immobilized)
        .unwrap();
    let frozen_at = pose_of(&engine, ship).position;

    let mut timed_out = false;
    for _ in 0..MAX_STEPS {
        let snapshot = engine.tick();
        timed_out |= snapshot
            .events
            .contains(&TurnEvent::MovementComplete { finished: 0, timed_out: true });
        if engine.turn() == 2 {
            break;
        }
    }
    assert!(timed_out);
    assert_eq!(engine.turn(), 2);
    assert_eq!(pose_of(&engine, ship).position, frozen_at);
}

#[test]
fn test_immobilized_ship_does_not_start_its_move() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "A", DVec3::ZERO);
    engine
        .plan_linear_move(ship, Pose::at(DVec3::new(0.0, 0.0, 300.0)))
        .unwrap();
    engine
        .world_mut()
        .insert_one(from_id(ship).unwrap(), Immobilized)
        .unwrap();

    let events = run_turn(&mut engine);
    assert!(events
        .iter()
        .any(|(_, e)| *e == TurnEvent::MovementComplete { finished: 0, timed_out: false }));
    assert_eq!(pose_of(&engine, ship).position, DVec3::ZERO);
}

#[test]
fn test_cancel_move_invalidates_prediction() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));

    let still = engine.predict_arc(weapon, target);
    assert_eq!(still.firing_windows, vec![FiringWindow { start: 0.0, end: 1.0 }]);

    engine
        .plan_linear_move(target, Pose::at(DVec3::new(300.0, 0.0, -200.0)))
        .unwrap();
    let moving = engine.predict_arc(weapon, target);
    assert_ne!(moving, still);
    assert!(moving.firing_windows[0].end < 1.0);

    assert_eq!(engine.cancel_move(target), Ok(true));
    assert_eq!(engine.cancel_move(target), Ok(false));
    assert_eq!(engine.predict_arc(weapon, target), still);
}

#[test]
fn test_immobilized_plan_is_ignored_by_prediction() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));
    let still = engine.predict_arc(weapon, target);

    engine
        .plan_linear_move(target, Pose::at(DVec3::new(300.0, 0.0, -200.0)))
        .unwrap();
    engine
        .world_mut()
        .insert_one(from_id(target).unwrap(), Immobilized)
        .unwrap();

    assert_eq!(engine.predict_arc(weapon, target), still);
    assert_eq!(engine.pose_at(target, 0.5), Some(pose_of(&engine, target)));
}

// ---- Prediction ----

#[test]
fn test_orbiting_target_window() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 100.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));
    engine
        .plan_move(target, Box::new(Orbit { sweep_degrees: 90.0 }))
        .unwrap();

    let windows = engine.firing_windows(weapon, target);
    assert_eq!(windows.len(), 1);
    assert_eq!(windows[0].start, 0.0);
    assert!((windows[0].end - 0.35).abs() < 1e-12, "end = {}", windows[0].end);
}

#[test]
fn test_prediction_is_idempotent() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(50.0, 0.0, 100.0));
    let weapon = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Lance"));
    engine
        .plan_linear_move(target, Pose::at(DVec3::new(-300.0, 0.0, 150.0)))
        .unwrap();

    let world = engine.world();
    let w = from_id(weapon).unwrap();
    let t = from_id(target).unwrap();
    let a = arc_prediction::predict(world, w, t, 10);
    let b = arc_prediction::predict(world, w, t, 10);
    assert_eq!(a, b);
    assert_eq!(a.min_angle_degrees.to_bits(), b.min_angle_degrees.to_bits());
}

// ---- Forced turn end ----

#[test]
fn test_force_end_mid_simulation_resolves_once() {
    let mut engine = TurnEngine::default();
    let shooter = ship_at(&mut engine, "Shooter", DVec3::ZERO);
    let target = ship_at(&mut engine, "Target", DVec3::new(0.0, 0.0, 200.0));
    let cold = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Cold"));
    let fast = weapon_on(&mut engine, shooter, WeaponBlueprint::new("Fast"));
    let slow = weapon_on(
        &mut engine,
        shooter,
        WeaponBlueprint {
            spin_up_secs: 2.0,
            ..WeaponBlueprint::new("Slow")
        },
    );
    with_weapon(&mut engine, cold, |w| w.cooldown.force_remaining(2));
    force_heat(&mut engine, shooter, 50.0);
    engine
        .plan_linear_move(target, Pose::at(DVec3::new(0.0, 0.0, 800.0)))
        .unwrap();
    engine.queue_fire(fast, target).unwrap();
    engine.queue_fire(slow, target).unwrap();

    let mut events: Vec<TurnEvent> = Vec::new();
    engine.queue_command(TurnCommand::EndCommandPhase);
    // The second volley would start at 0.3 s.
    for _ in 0..5 {
        events.extend(engine.tick().events);
    }
    assert_eq!(engine.phase(), TurnPhase::Simulation);

    let report = engine.force_end_turn().unwrap();
    assert_eq!(report.turn, 1);
    assert_eq!(engine.turn(), 2);
    assert_eq!(engine.phase(), TurnPhase::Command);

    // 50 + 10 from the fast shot, minus 10 base and 2 × 5 radiators.
    assert_eq!(engine.heat(shooter).unwrap().current(), 40.0);
    assert_eq!(with_weapon(&mut engine, cold, |w| w.cooldown.remaining()), 1);
    assert!(with_weapon(&mut engine, slow, |w| w.cooldown.is_ready()), "slow volley never fired");

    let z = pose_of(&engine, target).position.z;
    assert!(z > 200.0 && z < 800.0, "move frozen mid-way, z = {z}");
    assert!(engine
        .world()
        .get::<&MoveOrder>(from_id(target).unwrap())
        .is_err());

    for _ in 0..200 {
        events.extend(engine.tick().events);
    }
    assert_eq!(engine.turn(), 2, "no further turn end without the host");
    assert_eq!(engine.heat(shooter).unwrap().current(), 40.0);
    assert_eq!(
        events
            .iter()
            .filter(|e| matches!(e, TurnEvent::TurnEnd { .. }))
            .count(),
        1
    );
    assert!(!events
        .iter()
        .any(|e| matches!(e, TurnEvent::FireBatchComplete { .. })));
    assert!(events.contains(&TurnEvent::SimulationPhaseEnd));
}

#[test]
fn test_force_end_from_command_phase_still_resolves() {
    let mut engine = TurnEngine::default();
    let ship = ship_at(&mut engine, "Ship", DVec3::ZERO);
    force_heat(&mut engine, ship, 30.0);
    engine.tick();
    engine.queue_command(TurnCommand::ForceEndTurn);
    let snapshot = engine.tick();

    assert_eq!(snapshot.turn, 2);
    assert_eq!(engine.heat(ship).unwrap().current(), 10.0);
    assert!(!snapshot.events.contains(&TurnEvent::SimulationPhaseEnd));
    assert_eq!(
        snapshot.events,
        vec![
            TurnEvent::HeatDissipated {
                ship,
                dissipated: 20.0,
                passive: 0.0,
                heat: 10.0,
            },
            TurnEvent::TurnEnd { turn: 1 },
            TurnEvent::TurnStart { turn: 2 },
            TurnEvent::CommandPhaseStart,
        ]
    );
    assert_eq!(snapshot.last_turn_end.unwrap().turn, 1);
}

// ---- Properties ----

#[test]
fn test_property_cooldown_never_negative() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    for _ in 0..200 {
        let k: u32 = rng.gen_range(0..6);
        let ticks: u32 = rng.gen_range(0..10);
        let mut weapon = Weapon {
            name: "W".into(),
            firing_arc_degrees: 60.0,
            max_range: 100.0,
            spin_up_secs: 0.1,
            heat_cost: 1.0,
            max_cooldown: k,
            cooldown: Default::default(),
            ammo_capacity: None,
            ammo: 0,
            group: WeaponGroup::None,
        };
        weapon.discharge();
        assert_eq!(weapon.cooldown.remaining(), k);
        for _ in 0..ticks {
            weapon.cooldown.tick();
        }
        assert_eq!(weapon.cooldown.remaining(), k.saturating_sub(ticks));
        assert_eq!(weapon.can_fire(), ticks >= k);
    }
}

#[test]
fn test_property_dissipation_floor() {
    let mut rng = ChaCha8Rng::seed_from_u64(11);
    let conditions = [
        SubsystemCondition::Operational,
        SubsystemCondition::Damaged,
        SubsystemCondition::Destroyed,
    ];
    for _ in 0..50 {
        let mut engine = TurnEngine::default();
        let mut bp = ShipBlueprint::new("Ship", Pose::default());
        let radiator_count = rng.gen_range(0..4);
        bp.radiators = (0..radiator_count)
            .map(|_| conditions[rng.gen_range(0..conditions.len())])
            .collect();
        let ship = engine.spawn_ship(&bp);
        let before: f64 = rng.gen_range(0.0..60.0);
        force_heat(&mut engine, ship, before);

        let rate = crate::systems::turn_end::dissipation_rate(&engine.config().heat, &bp.radiators);
        engine.force_end_turn().unwrap();
        let heat = engine.heat(ship).unwrap();
        assert!((heat.current() - (before - rate).max(0.0)).abs() < 1e-9);
        assert_eq!(heat.planned(), 0.0);
    }
}

#[test]
fn test_property_firing_windows_well_formed() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    for _ in 0..200 {
        let mut engine = TurnEngine::default();
        let yaw = rng.gen_range(-3.0..3.0);
        let shooter = engine.spawn_ship(&ShipBlueprint::new(
            "Shooter",
            Pose::new(DVec3::ZERO, DQuat::from_rotation_y(yaw)),
        ));
        let mut random_point = || {
            DVec3::new(
                rng.gen_range(-500.0..500.0),
                rng.gen_range(-50.0..50.0),
                rng.gen_range(-500.0..500.0),
            )
        };
        let (start, end, shooter_end) = (random_point(), random_point(), random_point());
        let target = ship_at(&mut engine, "Target", start);
        let weapon = weapon_on(
            &mut engine,
            shooter,
            WeaponBlueprint {
                firing_arc_degrees: 90.0,
                ..WeaponBlueprint::new("Lance")
            },
        );
        engine.plan_linear_move(target, Pose::at(end)).unwrap();
        engine
            .plan_move(
                shooter,
                Box::new(LinearTrajectory::new(
                    Pose::new(DVec3::ZERO, DQuat::from_rotation_y(yaw)),
                    Pose::new(shooter_end * 0.1, DQuat::from_rotation_y(-yaw)),
                )),
            )
            .unwrap();

        let result = engine.predict_arc(weapon, target);
        let windows = engine.firing_windows(weapon, target);
        for w in [&result.firing_windows, &windows] {
            assert!(w.iter().all(|win| win.start < win.end), "{w:?}");
            assert!(w.windows(2).all(|pair| pair[0].end < pair[1].start), "{w:?}");
        }
        match result.optimal_firing_time {
            Some(t) => {
                assert!(result.will_be_in_arc);
                let containing = result
                    .firing_windows
                    .iter()
                    .filter(|win| win.contains(t))
                    .count();
                assert_eq!(containing, 1, "t = {t}, windows {:?}", result.firing_windows);
            }
            None => {
                assert!(!result.will_be_in_arc);
                assert!(result.firing_windows.is_empty());
                assert!(!result.in_range_at_optimal);
            }
        }
    }
}

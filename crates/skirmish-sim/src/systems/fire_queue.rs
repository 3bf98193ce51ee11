//! Fire command queue. Accumulates weapon fire intents during the Command
//! phase and executes them as spin-up volleys during the Simulation phase.
//!
//! Queue-time checks cover only what cannot change before execution
//! (duplicates, cooldown, ammo, heat headroom). Arc and range are checked
//! again, statically, when each command's volley starts.

use std::collections::{BTreeMap, VecDeque};

use hecs::{Entity, World};
use tracing::{debug, info, warn};

use skirmish_core::components::{Destroyed, Ship, Weapon, WeaponMount};
use skirmish_core::config::FireConfig;
use skirmish_core::enums::WeaponGroup;
use skirmish_core::events::{FireFailure, FireRejection, TurnEvent};
use skirmish_core::heat::HeatState;
use skirmish_core::state::{FireQueueView, QueuedFireView};
use skirmish_core::types::{Pose, SimTime};

use crate::bus::EventBus;
use crate::ids::{from_id, to_id};
use crate::systems::arc_prediction;
use crate::timer::{CancelToken, Countdown};
use crate::world_setup::weapons_of;

/// One pending fire intent.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FireCommand {
    pub weapon: Entity,
    pub target: Entity,
    /// Ship carrying the weapon at queue time.
    pub ship: Entity,
    pub group: WeaponGroup,
    pub queued_at: SimTime,
    pub alpha_strike: bool,
}

/// Commands sharing one quantized spin-up delay.
#[derive(Debug)]
struct Volley {
    spin_up_secs: f64,
    commands: Vec<FireCommand>,
}

/// A fired weapon waiting for its spin-up before the shot leaves the mount.
#[derive(Debug)]
struct PendingShot {
    weapon: Entity,
    target: Entity,
    spin_up: Countdown,
}

/// State of one `execute` call while its volleys play out.
#[derive(Debug)]
struct VolleyRun {
    volleys: VecDeque<Volley>,
    shots: Vec<PendingShot>,
    /// Time until the next volley may start.
    wait: Countdown,
    fired: usize,
    failed: usize,
    token: CancelToken,
}

/// The process-wide fire queue. Touched only from the turn loop.
#[derive(Debug)]
pub struct FireQueue {
    commands: Vec<FireCommand>,
    run: Option<VolleyRun>,
    settings: FireConfig,
    ceiling_factor: f64,
}

impl FireQueue {
    pub fn new(settings: FireConfig, ceiling_factor: f64) -> Self {
        Self {
            commands: Vec::new(),
            run: None,
            settings,
            ceiling_factor,
        }
    }

    /// Queue a single weapon against a target.
    pub fn queue_fire(
        &mut self,
        world: &World,
        weapon: Entity,
        target: Entity,
        now: SimTime,
        bus: &mut EventBus,
    ) -> Result<(), FireRejection> {
        self.queue_one(world, weapon, target, now, false, bus)
    }

    /// Queue every weapon of `ship` assigned to `group`. Weapons that fail
    /// their individual checks are skipped. Returns how many were queued.
    pub fn queue_group_fire(
        &mut self,
        world: &World,
        ship: Entity,
        group: WeaponGroup,
        target: Entity,
        now: SimTime,
        bus: &mut EventBus,
    ) -> usize {
        if group == WeaponGroup::None {
            debug!("group fire with no group selected");
            return 0;
        }
        let members: Vec<Entity> = weapons_of(world, ship)
            .into_iter()
            .filter(|&w| {
                world
                    .get::<&Weapon>(w)
                    .map(|weapon| weapon.group == group)
                    .unwrap_or(false)
            })
            .collect();
        self.queue_batch(world, &members, target, now, false, bus)
    }

    /// Queue every weapon on `ship`. Returns how many were queued.
    pub fn queue_alpha_strike(
        &mut self,
        world: &World,
        ship: Entity,
        target: Entity,
        now: SimTime,
        bus: &mut EventBus,
    ) -> usize {
        let members = weapons_of(world, ship);
        self.queue_batch(world, &members, target, now, true, bus)
    }

    /// Remove the pending command for `weapon`. Returns whether one existed.
    pub fn cancel(&mut self, weapon: Entity, bus: &mut EventBus) -> bool {
        let before = self.commands.len();
        self.commands.retain(|c| c.weapon != weapon);
        let removed = self.commands.len() != before;
        if removed {
            bus.emit(TurnEvent::FireCancelled {
                weapon: to_id(weapon),
            });
        }
        removed
    }

    /// Drop every pending command. Returns how many were removed.
    pub fn clear(&mut self) -> usize {
        let removed = self.commands.len();
        self.commands.clear();
        removed
    }

    /// Heat the queued commands would add across all ships.
    pub fn total_queued_heat(&self, world: &World) -> f64 {
        self.commands
            .iter()
            .map(|c| weapon_heat_cost(world, c.weapon))
            .sum()
    }

    /// Heat the queued commands would add to `ship`.
    pub fn queued_heat_for(&self, world: &World, ship: Entity) -> f64 {
        self.commands
            .iter()
            .filter(|c| c.ship == ship)
            .map(|c| weapon_heat_cost(world, c.weapon))
            .sum()
    }

    pub fn queued_count(&self) -> usize {
        self.commands.len()
    }

    pub fn is_queued(&self, weapon: Entity) -> bool {
        self.commands.iter().any(|c| c.weapon == weapon)
    }

    /// True while volleys from the last `execute` are still playing out.
    pub fn is_executing(&self) -> bool {
        self.run.is_some()
    }

    /// Pending commands in queue order.
    pub fn commands(&self) -> &[FireCommand] {
        &self.commands
    }

    pub fn view(&self, world: &World) -> FireQueueView {
        FireQueueView {
            queued: self
                .commands
                .iter()
                .map(|c| QueuedFireView {
                    weapon: to_id(c.weapon),
                    target: to_id(c.target),
                    group: c.group.number(),
                    alpha_strike: c.alpha_strike,
                    queued_at: c.queued_at,
                })
                .collect(),
            executing: self.is_executing(),
            total_queued_heat: self.total_queued_heat(world),
        }
    }

    /// Consume the queue into spin-up volleys, fastest first, and start the
    /// first volley immediately. Returns the number of volleys.
    pub fn execute(&mut self, world: &mut World, token: CancelToken, bus: &mut EventBus) -> usize {
        if self.run.is_some() {
            warn!("fire queue already executing, execute ignored");
            return 0;
        }

        let quantum = self.settings.spin_up_quantum_secs;
        let mut grouped: BTreeMap<i64, Volley> = BTreeMap::new();
        for command in self.commands.drain(..) {
            let spin_up = world
                .get::<&Weapon>(command.weapon)
                .map(|w| w.spin_up_secs)
                .unwrap_or(0.0);
            grouped
                .entry(spin_up_key(spin_up, quantum))
                .or_insert_with(|| Volley {
                    spin_up_secs: spin_up,
                    commands: Vec::new(),
                })
                .commands
                .push(command);
        }

        if grouped.is_empty() {
            debug!("fire queue empty at execution");
            bus.emit(TurnEvent::FireBatchComplete {
                fired: 0,
                failed: 0,
            });
            return 0;
        }

        let volleys: VecDeque<Volley> = grouped.into_values().collect();
        let count = volleys.len();
        info!(volleys = count, "executing fire queue");
        self.run = Some(VolleyRun {
            volleys,
            shots: Vec::new(),
            wait: Countdown::new(0.0),
            fired: 0,
            failed: 0,
            token,
        });
        self.start_next_volley(world, bus);
        count
    }

    /// Step pending shots and volley waits by `dt`.
    pub fn advance(&mut self, world: &mut World, dt: f64, bus: &mut EventBus) {
        let Some(run) = self.run.as_mut() else {
            return;
        };
        if run.token.is_cancelled() {
            self.abort();
            return;
        }

        run.shots.retain_mut(|shot| {
            if shot.spin_up.tick(dt) {
                bus.emit(TurnEvent::WeaponDischarged {
                    weapon: to_id(shot.weapon),
                    target: to_id(shot.target),
                });
                false
            } else {
                true
            }
        });

        if !run.wait.tick(dt) {
            return;
        }
        if !run.volleys.is_empty() {
            self.start_next_volley(world, bus);
            return;
        }
        if run.shots.is_empty() {
            let (fired, failed) = (run.fired, run.failed);
            info!(fired, failed, "fire batch complete");
            bus.emit(TurnEvent::FireBatchComplete { fired, failed });
            self.run = None;
        }
    }

    /// Hard stop. Volleys not yet started and shots still spinning up are
    /// dropped without compensation.
    pub fn abort(&mut self) {
        let Some(run) = self.run.take() else {
            return;
        };
        let unstarted: usize = run.volleys.iter().map(|v| v.commands.len()).sum();
        if unstarted > 0 || !run.shots.is_empty() {
            warn!(
                unstarted,
                spinning_up = run.shots.len(),
                "volley run cut short"
            );
        }
    }

    fn queue_batch(
        &mut self,
        world: &World,
        weapons: &[Entity],
        target: Entity,
        now: SimTime,
        alpha_strike: bool,
        bus: &mut EventBus,
    ) -> usize {
        weapons
            .iter()
            .filter(|&&weapon| {
                self.queue_one(world, weapon, target, now, alpha_strike, bus)
                    .is_ok()
            })
            .count()
    }

    fn queue_one(
        &mut self,
        world: &World,
        weapon: Entity,
        target: Entity,
        now: SimTime,
        alpha_strike: bool,
        bus: &mut EventBus,
    ) -> Result<(), FireRejection> {
        match self.check_queue(world, weapon, target) {
            Ok(command) => {
                self.commands.push(FireCommand {
                    queued_at: now,
                    alpha_strike,
                    ..command
                });
                debug!(weapon = ?to_id(weapon), target = ?to_id(target), "fire queued");
                bus.emit(TurnEvent::FireQueued {
                    weapon: to_id(weapon),
                    target: to_id(target),
                });
                Ok(())
            }
            Err(reason) => {
                debug!(weapon = ?to_id(weapon), reason = %reason, "fire rejected");
                bus.emit(TurnEvent::FireRejected {
                    weapon: to_id(weapon),
                    reason: reason.clone(),
                });
                Err(reason)
            }
        }
    }

    fn check_queue(
        &self,
        world: &World,
        weapon: Entity,
        target: Entity,
    ) -> Result<FireCommand, FireRejection> {
        let (stats, ship) = {
            let Ok(w) = world.get::<&Weapon>(weapon) else {
                return Err(FireRejection::UnknownWeapon);
            };
            let ship = world
                .get::<&WeaponMount>(weapon)
                .ok()
                .and_then(|m| from_id(m.ship))
                .ok_or(FireRejection::UnknownWeapon)?;
            ((*w).clone(), ship)
        };
        if world.get::<&Ship>(target).is_err() {
            return Err(FireRejection::UnknownTarget);
        }
        if world.get::<&Destroyed>(ship).is_ok() {
            return Err(FireRejection::ShipDestroyed);
        }
        if self.is_queued(weapon) {
            return Err(FireRejection::AlreadyQueued);
        }
        if !stats.cooldown.is_ready() {
            return Err(FireRejection::CoolingDown {
                remaining: stats.cooldown.remaining(),
            });
        }
        if !stats.has_ammo() {
            return Err(FireRejection::OutOfAmmo);
        }
        if let Ok(heat) = world.get::<&HeatState>(ship) {
            let queued = self.queued_heat_for(world, ship);
            if !heat.fits_under_ceiling(queued + stats.heat_cost, self.ceiling_factor) {
                return Err(FireRejection::HeatCeiling {
                    projected: heat.projected() + queued,
                    cost: stats.heat_cost,
                    ceiling: heat.ceiling(self.ceiling_factor),
                });
            }
        }

        Ok(FireCommand {
            weapon,
            target,
            ship,
            group: stats.group,
            queued_at: SimTime::default(),
            alpha_strike: false,
        })
    }

    fn start_next_volley(&mut self, world: &mut World, bus: &mut EventBus) {
        let margin = self.settings.settle_margin_secs;
        let Some(run) = self.run.as_mut() else {
            return;
        };
        let Some(volley) = run.volleys.pop_front() else {
            return;
        };

        debug!(
            spin_up_secs = volley.spin_up_secs,
            commands = volley.commands.len(),
            "volley started"
        );
        bus.emit(TurnEvent::VolleyStarted {
            spin_up_secs: volley.spin_up_secs,
            commands: volley.commands.len(),
        });

        for command in &volley.commands {
            let failure = validate_now(world, command).err();
            if failure.is_none() {
                fire(world, command);
                run.fired += 1;
                run.shots.push(PendingShot {
                    weapon: command.weapon,
                    target: command.target,
                    spin_up: Countdown::new(volley.spin_up_secs),
                });
            } else {
                run.failed += 1;
                debug!(weapon = ?to_id(command.weapon), failure = ?failure, "fire failed at execution");
            }
            bus.emit(TurnEvent::FireExecuted {
                weapon: to_id(command.weapon),
                target: to_id(command.target),
                executed: failure.is_none(),
                failure,
            });
        }

        run.wait = Countdown::new(volley.spin_up_secs + margin);
    }
}

/// Grouping key: spin-up rounded to the configured quantum.
pub fn spin_up_key(spin_up_secs: f64, quantum_secs: f64) -> i64 {
    if quantum_secs <= 0.0 {
        return spin_up_secs.to_bits() as i64;
    }
    (spin_up_secs / quantum_secs).round() as i64
}

/// Static check at the instant the command's volley starts.
fn validate_now(world: &World, command: &FireCommand) -> Result<(), FireFailure> {
    let (half_arc, max_range, ready, ship) = {
        let Ok(weapon) = world.get::<&Weapon>(command.weapon) else {
            return Err(FireFailure::WeaponMissing);
        };
        let ship = world
            .get::<&WeaponMount>(command.weapon)
            .ok()
            .and_then(|m| from_id(m.ship));
        (
            weapon.half_arc_degrees(),
            weapon.max_range,
            weapon.can_fire(),
            ship,
        )
    };
    let Ok(target_pose) = world.get::<&Pose>(command.target).map(|p| *p) else {
        return Err(FireFailure::TargetMissing);
    };
    if world.get::<&Destroyed>(command.target).is_ok() {
        return Err(FireFailure::TargetDestroyed);
    }
    let ship_alive = ship.is_some_and(|s| world.get::<&Destroyed>(s).is_err());
    if !ready || !ship_alive {
        return Err(FireFailure::WeaponUnavailable);
    }
    let Some(mount) = arc_prediction::current_mount_pose(world, command.weapon) else {
        return Err(FireFailure::WeaponUnavailable);
    };

    let (angle, distance) = arc_prediction::bearing_and_range(&mount, target_pose.position);
    if angle >= half_arc {
        return Err(FireFailure::OutOfArc {
            angle_degrees: angle,
        });
    }
    if distance > max_range {
        return Err(FireFailure::OutOfRange { distance });
    }
    Ok(())
}

/// Apply one shot's costs: cooldown and ammo on the weapon, heat on the ship.
fn fire(world: &mut World, command: &FireCommand) {
    let (cost, ship) = {
        let Ok(mut weapon) = world.get::<&mut Weapon>(command.weapon) else {
            return;
        };
        weapon.discharge();
        let ship = world
            .get::<&WeaponMount>(command.weapon)
            .ok()
            .and_then(|m| from_id(m.ship));
        (weapon.heat_cost, ship)
    };
    if let Some(ship) = ship {
        if let Ok(mut heat) = world.get::<&mut HeatState>(ship) {
            heat.add_planned(cost);
            heat.commit_planned();
        }
    }
}

fn weapon_heat_cost(world: &World, weapon: Entity) -> f64 {
    world
        .get::<&Weapon>(weapon)
        .map(|w| w.heat_cost)
        .unwrap_or(0.0)
}

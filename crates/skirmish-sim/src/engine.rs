//! Turn engine, the root of the simulation.
//!
//! `TurnEngine` owns the hecs ECS world, applies host commands, drives the
//! phase state machine and its timed work, and produces `TurnSnapshot`s.
//! Completely headless, enabling deterministic testing.

use std::collections::VecDeque;

use hecs::{Entity, World};
use tracing::{debug, warn};

use skirmish_core::commands::TurnCommand;
use skirmish_core::components::{MoveOrder, Ship};
use skirmish_core::config::SkirmishConfig;
use skirmish_core::constants::DT;
use skirmish_core::enums::{HeatTier, SimulationStage, TurnPhase, WeaponGroup};
use skirmish_core::heat::HeatState;
use skirmish_core::state::{ArcValidationResult, FiringWindow, TurnEndReport, TurnSnapshot};
use skirmish_core::trajectory::{LinearTrajectory, Trajectory};
use skirmish_core::types::{EntityId, Pose, SimTime};

use crate::bus::{EventBus, SharedSubscriber};
use crate::error::TurnError;
use crate::ids::{from_id, to_id};
use crate::phase::{TurnController, TurnEndContext};
use crate::systems;
use crate::systems::arc_prediction::ArcCache;
use crate::systems::fire_queue::FireQueue;
use crate::systems::movement::{self, MovementCoordinator};
use crate::systems::snapshot::PhaseView;
use crate::systems::turn_end::TurnEndResolver;
use crate::world_setup::{self, ShipBlueprint, WeaponBlueprint};

/// The turn engine. Owns the ECS world and all turn state.
pub struct TurnEngine {
    world: World,
    config: SkirmishConfig,
    time: SimTime,
    controller: TurnController,
    movement: MovementCoordinator,
    fire_queue: FireQueue,
    resolver: TurnEndResolver,
    arc_cache: ArcCache,
    bus: EventBus,
    command_queue: VecDeque<TurnCommand>,
}

impl TurnEngine {
    /// Create an engine with an empty world. The config is expected to be
    /// validated already (see `SkirmishConfig::from_json`).
    pub fn new(config: SkirmishConfig) -> Self {
        Self {
            world: World::new(),
            time: SimTime::default(),
            controller: TurnController::new(config.turn.clone()),
            movement: MovementCoordinator::new(),
            fire_queue: FireQueue::new(config.fire.clone(), config.heat.activation_ceiling_factor),
            resolver: TurnEndResolver::new(),
            arc_cache: ArcCache::new(),
            bus: EventBus::new(),
            command_queue: VecDeque::new(),
            config,
        }
    }

    /// Queue a host command for processing at the next step boundary.
    pub fn queue_command(&mut self, command: TurnCommand) {
        self.command_queue.push_back(command);
    }

    /// Queue multiple commands.
    pub fn queue_commands(&mut self, commands: impl IntoIterator<Item = TurnCommand>) {
        self.command_queue.extend(commands);
    }

    /// Advance one fixed step and return the resulting snapshot.
    pub fn tick(&mut self) -> TurnSnapshot {
        self.advance(DT)
    }

    /// Advance by a host-supplied `dt` and return the resulting snapshot.
    pub fn advance(&mut self, dt: f64) -> TurnSnapshot {
        self.controller.start(&mut self.bus);
        self.process_commands();

        if self.controller.phase() == TurnPhase::Simulation {
            self.step_simulation(dt);
        }
        self.time.advance(dt);
        self.snapshot()
    }

    /// Drain pending events into a snapshot of the current state.
    pub fn snapshot(&mut self) -> TurnSnapshot {
        let events = self.bus.drain();
        systems::snapshot::build_snapshot(
            &self.world,
            &self.time,
            PhaseView {
                turn: self.controller.turn(),
                phase: self.controller.phase(),
                stage: self.controller.stage(),
                progress: self.controller.progress(),
            },
            &self.fire_queue,
            &self.config.heat.thresholds,
            events,
            self.resolver.last_report().cloned(),
        )
    }

    // --- Phase control ---

    /// Finish planning: start the Simulation phase, every planned move and
    /// the fire queue's volleys.
    pub fn end_command_phase(&mut self) -> Result<(), TurnError> {
        self.controller.start(&mut self.bus);
        let token = self.controller.begin_simulation(&mut self.bus)?;

        systems::resources::cancel_all_previews(&mut self.world);
        self.movement.begin(
            &mut self.world,
            self.config.turn.simulation_duration_secs,
            token.clone(),
            &mut self.bus,
        );
        self.fire_queue.execute(&mut self.world, token, &mut self.bus);
        self.arc_cache.invalidate_all();
        Ok(())
    }

    /// Abandon the current phase and resolve the turn end now.
    pub fn force_end_turn(&mut self) -> Result<TurnEndReport, TurnError> {
        self.controller.start(&mut self.bus);
        self.finish_turn()
    }

    // --- Fire planning ---

    pub fn queue_fire(&mut self, weapon: EntityId, target: EntityId) -> Result<(), TurnError> {
        self.require_phase(TurnPhase::Command)?;
        self.fire_queue.queue_fire(
            &self.world,
            entity(weapon),
            entity(target),
            self.time,
            &mut self.bus,
        )?;
        Ok(())
    }

    /// Returns how many weapons of the group were queued.
    pub fn queue_group_fire(
        &mut self,
        ship: EntityId,
        group: WeaponGroup,
        target: EntityId,
    ) -> Result<usize, TurnError> {
        self.require_phase(TurnPhase::Command)?;
        Ok(self.fire_queue.queue_group_fire(
            &self.world,
            entity(ship),
            group,
            entity(target),
            self.time,
            &mut self.bus,
        ))
    }

    /// Returns how many weapons were queued.
    pub fn queue_alpha_strike(&mut self, ship: EntityId, target: EntityId) -> Result<usize, TurnError> {
        self.require_phase(TurnPhase::Command)?;
        Ok(self.fire_queue.queue_alpha_strike(
            &self.world,
            entity(ship),
            entity(target),
            self.time,
            &mut self.bus,
        ))
    }

    pub fn cancel_fire(&mut self, weapon: EntityId) -> bool {
        self.fire_queue.cancel(entity(weapon), &mut self.bus)
    }

    pub fn clear_fire_queue(&mut self) -> usize {
        self.fire_queue.clear()
    }

    // --- Movement planning ---

    /// Plan a move along a host trajectory, replacing any earlier plan.
    pub fn plan_move(&mut self, ship: EntityId, trajectory: Box<dyn Trajectory>) -> Result<(), TurnError> {
        self.require_phase(TurnPhase::Command)?;
        let e = self.ship_entity(ship)?;
        self.world
            .insert_one(e, MoveOrder::new(trajectory))
            .map_err(|_| TurnError::UnknownEntity(ship))?;
        self.arc_cache.invalidate_all();
        debug!(ship = ?ship, "move planned");
        Ok(())
    }

    /// Plan a straight move from the ship's current pose.
    pub fn plan_linear_move(&mut self, ship: EntityId, destination: Pose) -> Result<(), TurnError> {
        let e = self.ship_entity(ship)?;
        let from = self
            .world
            .get::<&Pose>(e)
            .map(|p| *p)
            .map_err(|_| TurnError::UnknownEntity(ship))?;
        self.plan_move(ship, Box::new(LinearTrajectory::new(from, destination)))
    }

    /// Drop a planned move. Returns whether one existed.
    pub fn cancel_move(&mut self, ship: EntityId) -> Result<bool, TurnError> {
        self.require_phase(TurnPhase::Command)?;
        let e = self.ship_entity(ship)?;
        let removed = self.world.remove_one::<MoveOrder>(e).is_ok();
        if removed {
            self.arc_cache.invalidate_all();
        }
        Ok(removed)
    }

    // --- Abilities and tooling ---

    pub fn activate_ability(&mut self, ship: EntityId, slot: usize) -> Result<(), TurnError> {
        self.require_phase(TurnPhase::Command)?;
        systems::resources::activate(
            &mut self.world,
            entity(ship),
            slot,
            self.config.heat.activation_ceiling_factor,
            &mut self.bus,
        )?;
        Ok(())
    }

    /// Show an ability's heat as planned heat. Returns the projected heat.
    pub fn preview_ability(&mut self, ship: EntityId, slot: usize) -> Result<f64, TurnError> {
        self.require_phase(TurnPhase::Command)?;
        Ok(systems::resources::preview(
            &mut self.world,
            entity(ship),
            slot,
            self.config.heat.activation_ceiling_factor,
        )?)
    }

    pub fn cancel_heat_preview(&mut self, ship: EntityId) -> bool {
        systems::resources::cancel_preview(&mut self.world, entity(ship))
    }

    pub fn instant_cool(&mut self, ship: EntityId) -> Result<(), TurnError> {
        if systems::resources::instant_cool(&mut self.world, entity(ship)) {
            Ok(())
        } else {
            Err(TurnError::UnknownEntity(ship))
        }
    }

    pub fn reset_cooldowns(&mut self, ship: EntityId) -> Result<(), TurnError> {
        if systems::resources::reset_cooldowns(&mut self.world, entity(ship)) {
            Ok(())
        } else {
            Err(TurnError::UnknownEntity(ship))
        }
    }

    // --- Prediction ---

    /// Arc/range prediction at the configured prediction resolution.
    pub fn predict_arc(&mut self, weapon: EntityId, target: EntityId) -> ArcValidationResult {
        let samples = self.config.fire.prediction_samples;
        self.arc_cache
            .get_or_predict(&self.world, entity(weapon), entity(target), samples)
    }

    /// Firing windows at the configured window-enumeration resolution.
    pub fn firing_windows(&mut self, weapon: EntityId, target: EntityId) -> Vec<FiringWindow> {
        let samples = self.config.fire.window_samples;
        self.arc_cache
            .get_or_predict(&self.world, entity(weapon), entity(target), samples)
            .firing_windows
    }

    // --- World setup ---

    pub fn spawn_ship(&mut self, blueprint: &ShipBlueprint) -> EntityId {
        to_id(world_setup::spawn_ship(&mut self.world, blueprint))
    }

    pub fn spawn_weapon(&mut self, ship: EntityId, blueprint: &WeaponBlueprint) -> Result<EntityId, TurnError> {
        world_setup::spawn_weapon(&mut self.world, entity(ship), blueprint)
            .map(to_id)
            .ok_or(TurnError::UnknownEntity(ship))
    }

    // --- Subscribers ---

    pub fn subscribe(&mut self, subscriber: SharedSubscriber) -> bool {
        self.bus.subscribe(subscriber)
    }

    pub fn unsubscribe(&mut self, subscriber: &SharedSubscriber) -> bool {
        self.bus.unsubscribe(subscriber)
    }

    // --- Accessors ---

    pub fn phase(&self) -> TurnPhase {
        self.controller.phase()
    }

    pub fn turn(&self) -> u32 {
        self.controller.turn()
    }

    pub fn stage(&self) -> SimulationStage {
        self.controller.stage()
    }

    pub fn progress(&self) -> f64 {
        self.controller.progress()
    }

    pub fn time(&self) -> SimTime {
        self.time
    }

    pub fn config(&self) -> &SkirmishConfig {
        &self.config
    }

    pub fn world(&self) -> &World {
        &self.world
    }

    /// Mutable world access for host collaborators (damage, degradation).
    /// Cached arc predictions are dropped since plans may change.
    pub fn world_mut(&mut self) -> &mut World {
        self.arc_cache.invalidate_all();
        &mut self.world
    }

    pub fn fire_queue(&self) -> &FireQueue {
        &self.fire_queue
    }

    pub fn is_moving(&self) -> bool {
        self.movement.is_moving()
    }

    pub fn last_turn_end(&self) -> Option<&TurnEndReport> {
        self.resolver.last_report()
    }

    pub fn heat(&self, ship: EntityId) -> Option<HeatState> {
        self.world.get::<&HeatState>(entity(ship)).ok().map(|h| *h)
    }

    pub fn heat_tier(&self, ship: EntityId) -> Option<HeatTier> {
        self.heat(ship).map(|h| h.tier(&self.config.heat.thresholds))
    }

    /// Predicted pose of an entity at normalized time `t` under its plan.
    pub fn pose_at(&self, ship: EntityId, t: f64) -> Option<Pose> {
        movement::pose_at(&self.world, entity(ship), t)
    }

    // --- Internals ---

    fn process_commands(&mut self) {
        while let Some(command) = self.command_queue.pop_front() {
            if let Err(error) = self.handle_command(&command) {
                match error {
                    TurnError::Fire(_) | TurnError::Ability(_) => {
                        debug!(?command, error = %error, "command refused")
                    }
                    _ => warn!(?command, error = %error, "command failed"),
                }
            }
        }
    }

    fn handle_command(&mut self, command: &TurnCommand) -> Result<(), TurnError> {
        match *command {
            TurnCommand::EndCommandPhase => self.end_command_phase(),
            TurnCommand::ForceEndTurn => self.force_end_turn().map(|_| ()),
            TurnCommand::QueueFire { weapon, target } => self.queue_fire(weapon, target),
            TurnCommand::QueueGroupFire {
                ship,
                group,
                target,
            } => self.queue_group_fire(ship, group, target).map(|_| ()),
            TurnCommand::QueueAlphaStrike { ship, target } => {
                self.queue_alpha_strike(ship, target).map(|_| ())
            }
            TurnCommand::CancelFire { weapon } => {
                self.cancel_fire(weapon);
                Ok(())
            }
            TurnCommand::ClearFireQueue => {
                self.clear_fire_queue();
                Ok(())
            }
            TurnCommand::PlanLinearMove { ship, destination } => {
                self.plan_linear_move(ship, destination)
            }
            TurnCommand::CancelMove { ship } => self.cancel_move(ship).map(|_| ()),
            TurnCommand::ActivateAbility { ship, slot } => self.activate_ability(ship, slot),
            TurnCommand::InstantCool { ship } => self.instant_cool(ship),
            TurnCommand::ResetCooldowns { ship } => self.reset_cooldowns(ship),
        }
    }

    fn step_simulation(&mut self, dt: f64) {
        self.movement.tick(&mut self.world, dt, &mut self.bus);
        self.fire_queue.advance(&mut self.world, dt, &mut self.bus);
        if self.controller.advance(dt, &mut self.bus) {
            if let Err(error) = self.finish_turn() {
                warn!(error = %error, "turn end failed");
            }
        }
    }

    fn finish_turn(&mut self) -> Result<TurnEndReport, TurnError> {
        let report = self.controller.end_turn(TurnEndContext {
            world: &mut self.world,
            fire_queue: &mut self.fire_queue,
            movement: &mut self.movement,
            resolver: &mut self.resolver,
            heat: &self.config.heat,
            bus: &mut self.bus,
        })?;
        self.arc_cache.invalidate_all();
        Ok(report)
    }

    fn require_phase(&self, expected: TurnPhase) -> Result<(), TurnError> {
        let actual = self.controller.phase();
        if actual == expected {
            Ok(())
        } else {
            Err(TurnError::WrongPhase { expected, actual })
        }
    }

    fn ship_entity(&self, ship: EntityId) -> Result<Entity, TurnError> {
        let e = entity(ship);
        if self.world.get::<&Ship>(e).is_ok() {
            Ok(e)
        } else {
            Err(TurnError::UnknownEntity(ship))
        }
    }
}

impl Default for TurnEngine {
    fn default() -> Self {
        Self::new(SkirmishConfig::default())
    }
}

/// Ids that could never name an entity resolve to a dangling handle, so the
/// usual "not found" path reports them.
fn entity(id: EntityId) -> Entity {
    from_id(id).unwrap_or(Entity::DANGLING)
}


//! Turn phase controller.
//!
//! Sequences Command → Simulation → TurnEnd → Command for as long as the
//! match runs and broadcasts every transition in a fixed order:
//! `TurnStart` → `CommandPhaseStart` → `SimulationPhaseStart` →
//! `SimulationProgress`* → `SimulationPhaseEnd` → turn-end resolution →
//! `TurnEnd(completed)` → next `TurnStart`.

use hecs::World;
use tracing::{debug, info, warn};

use skirmish_core::config::{HeatConfig, TurnConfig};
use skirmish_core::enums::{SimulationStage, TurnPhase};
use skirmish_core::events::TurnEvent;
use skirmish_core::state::TurnEndReport;

use crate::bus::EventBus;
use crate::error::TurnError;
use crate::systems::fire_queue::FireQueue;
use crate::systems::movement::{self, MovementCoordinator};
use crate::systems::turn_end::TurnEndResolver;
use crate::timer::{CancelToken, TIME_EPSILON};

/// The phase state machine. Turn numbers start at 1.
#[derive(Debug)]
pub struct TurnController {
    phase: TurnPhase,
    turn: u32,
    stage: SimulationStage,
    elapsed_secs: f64,
    config: TurnConfig,
    token: CancelToken,
    started: bool,
}

/// Everything turn-end processing touches.
pub struct TurnEndContext<'a> {
    pub world: &'a mut World,
    pub fire_queue: &'a mut FireQueue,
    pub movement: &'a mut MovementCoordinator,
    pub resolver: &'a mut TurnEndResolver,
    pub heat: &'a HeatConfig,
    pub bus: &'a mut EventBus,
}

impl TurnController {
    pub fn new(config: TurnConfig) -> Self {
        Self {
            phase: TurnPhase::Command,
            turn: 1,
            stage: SimulationStage::Idle,
            elapsed_secs: 0.0,
            config,
            token: CancelToken::new(),
            started: false,
        }
    }

    /// Broadcast the opening of turn 1. Later calls do nothing.
    pub fn start(&mut self, bus: &mut EventBus) {
        if self.started {
            return;
        }
        self.started = true;
        info!(turn = self.turn, "match started");
        bus.emit(TurnEvent::TurnStart { turn: self.turn });
        bus.emit(TurnEvent::CommandPhaseStart);
    }

    /// Command → Simulation. Returns the cancellation token for the phase's
    /// timed work.
    pub fn begin_simulation(&mut self, bus: &mut EventBus) -> Result<CancelToken, TurnError> {
        if self.phase != TurnPhase::Command {
            return Err(TurnError::WrongPhase {
                expected: TurnPhase::Command,
                actual: self.phase,
            });
        }
        self.phase = TurnPhase::Simulation;
        self.elapsed_secs = 0.0;
        self.token = CancelToken::new();

        let duration_secs = self.config.simulation_duration_secs;
        info!(turn = self.turn, duration_secs, "simulation phase started");
        bus.emit(TurnEvent::SimulationPhaseStart { duration_secs });
        bus.emit(TurnEvent::SimulationProgress { fraction: 0.0 });
        self.set_stage(stage_for(0.0, &self.config), bus);
        Ok(self.token.clone())
    }

    /// Advance Simulation progress by `dt`. Returns true once progress has
    /// reached 1; always false outside the Simulation phase.
    pub fn advance(&mut self, dt: f64, bus: &mut EventBus) -> bool {
        if self.phase != TurnPhase::Simulation {
            return false;
        }
        self.elapsed_secs += dt;
        let progress = self.progress();
        bus.emit(TurnEvent::SimulationProgress { fraction: progress });
        self.set_stage(stage_for(progress, &self.config), bus);
        progress >= 1.0
    }

    /// Run TurnEnd processing from any phase and return to Command.
    ///
    /// Running work of an interrupted Simulation phase is cut, not drained.
    pub fn end_turn(&mut self, ctx: TurnEndContext<'_>) -> Result<TurnEndReport, TurnError> {
        if self.phase == TurnPhase::TurnEnd {
            warn!(turn = self.turn, "turn end requested while one is in progress");
            return Err(TurnError::TurnEndInProgress);
        }
        let interrupted = self.phase;
        if interrupted == TurnPhase::Simulation && self.progress() < 1.0 {
            warn!(
                turn = self.turn,
                progress = self.progress(),
                "simulation phase cut short"
            );
        }

        self.token.cancel();
        ctx.movement.abort(ctx.world);
        ctx.fire_queue.abort();

        if interrupted == TurnPhase::Simulation {
            self.set_stage(SimulationStage::Complete, ctx.bus);
            ctx.bus.emit(TurnEvent::SimulationPhaseEnd);
        }

        self.phase = TurnPhase::TurnEnd;
        let completed = self.turn;
        let report = ctx.resolver.resolve(ctx.world, ctx.heat, completed, ctx.bus);
        let dropped = ctx.fire_queue.clear();
        if dropped > 0 {
            debug!(dropped, "unexecuted fire commands cleared");
        }
        movement::clear_orders(ctx.world);
        ctx.bus.emit(TurnEvent::TurnEnd { turn: completed });

        self.turn += 1;
        self.phase = TurnPhase::Command;
        self.stage = SimulationStage::Idle;
        self.elapsed_secs = 0.0;
        info!(turn = self.turn, "turn started");
        ctx.bus.emit(TurnEvent::TurnStart { turn: self.turn });
        ctx.bus.emit(TurnEvent::CommandPhaseStart);
        Ok(report)
    }

    pub fn phase(&self) -> TurnPhase {
        self.phase
    }

    pub fn turn(&self) -> u32 {
        self.turn
    }

    pub fn stage(&self) -> SimulationStage {
        self.stage
    }

    pub fn config(&self) -> &TurnConfig {
        &self.config
    }

    /// Simulation progress in `[0, 1]`; zero outside the Simulation phase.
    pub fn progress(&self) -> f64 {
        if self.phase != TurnPhase::Simulation {
            return 0.0;
        }
        let duration = self.config.simulation_duration_secs;
        if duration <= 0.0 || self.elapsed_secs + TIME_EPSILON >= duration {
            return 1.0;
        }
        (self.elapsed_secs / duration).clamp(0.0, 1.0)
    }

    /// Seconds of Simulation still to run.
    pub fn remaining_secs(&self) -> f64 {
        (self.config.simulation_duration_secs - self.elapsed_secs).max(0.0)
    }

    fn set_stage(&mut self, stage: SimulationStage, bus: &mut EventBus) {
        if stage != self.stage {
            debug!(from = ?self.stage, to = ?stage, "stage changed");
            self.stage = stage;
            bus.emit(TurnEvent::StageChanged { stage });
        }
    }
}

/// Stage for a Simulation progress value. Movement, weapon firing and
/// projectile travel take their configured fractions; damage resolution
/// happens once progress reaches 1.
pub fn stage_for(progress: f64, config: &TurnConfig) -> SimulationStage {
    let movement_end = config.movement_fraction;
    let firing_end = movement_end + config.weapon_firing_fraction;
    if progress >= 1.0 {
        SimulationStage::DamageResolution
    } else if progress < movement_end {
        SimulationStage::Movement
    } else if progress < firing_end {
        SimulationStage::WeaponFiring
    } else {
        SimulationStage::ProjectileTravel
    }
}

//! Movement coordinator.
//!
//! Starts every planned move at the beginning of the Simulation phase with
//! its duration synced to the phase, advances them independently each step,
//! and reports completion when all have finished or the phase duration has
//! elapsed, whichever comes first. Also exposes trajectory pass-throughs
//! used by arc prediction.

use glam::{DQuat, DVec3};
use hecs::{Entity, World};
use tracing::{debug, info, warn};

use skirmish_core::components::{Destroyed, Immobilized, MoveOrder, Ship};
use skirmish_core::enums::MoveState;
use skirmish_core::events::TurnEvent;
use skirmish_core::types::Pose;

use crate::bus::EventBus;
use crate::timer::{CancelToken, Countdown, TIME_EPSILON};

/// Tracks the moves started for the current Simulation phase.
#[derive(Debug, Default)]
pub struct MovementCoordinator {
    join: Option<MovementJoin>,
}

/// Duration-bounded join over all moves started this phase.
#[derive(Debug)]
struct MovementJoin {
    movers: Vec<Entity>,
    timeout: Countdown,
    token: CancelToken,
}

impl MovementCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start every planned move that is able to run. Returns how many started.
    ///
    /// With nothing to move the join completes immediately.
    pub fn begin(
        &mut self,
        world: &mut World,
        duration_secs: f64,
        token: CancelToken,
        bus: &mut EventBus,
    ) -> usize {
        if self.join.is_some() {
            warn!("movement already in progress, begin ignored");
            return 0;
        }

        let mut movers: Vec<Entity> = world
            .query::<(&Ship, &MoveOrder)>()
            .iter()
            .filter(|(_, (_, order))| order.state == MoveState::Planned)
            .map(|(entity, _)| entity)
            .filter(|entity| can_move(world, *entity))
            .collect();
        movers.sort_by_key(|e| e.id());

        for &entity in &movers {
            if let Ok(mut order) = world.get::<&mut MoveOrder>(entity) {
                order.duration_secs = duration_secs;
                order.elapsed_secs = 0.0;
                order.state = MoveState::Executing;
            }
        }

        if movers.is_empty() {
            debug!("no planned moves this turn");
            bus.emit(TurnEvent::MovementComplete {
                finished: 0,
                timed_out: false,
            });
            return 0;
        }

        info!(count = movers.len(), duration_secs, "moves started");
        let started = movers.len();
        self.join = Some(MovementJoin {
            movers,
            timeout: Countdown::new(duration_secs),
            token,
        });
        started
    }

    /// Advance all executing moves by `dt`. Returns true once the join has
    /// completed (or when nothing is moving).
    pub fn tick(&mut self, world: &mut World, dt: f64, bus: &mut EventBus) -> bool {
        let Some(join) = self.join.as_mut() else {
            return true;
        };
        if join.token.is_cancelled() {
            self.abort(world);
            return true;
        }

        for &entity in &join.movers {
            advance_move(world, entity, dt);
        }

        let finished = join
            .movers
            .iter()
            .filter(|entity| move_finished(world, **entity))
            .count();
        let all_finished = finished == join.movers.len();
        let timed_out = join.timeout.tick(dt) && !all_finished;

        if all_finished || timed_out {
            if timed_out {
                warn!(
                    finished,
                    total = join.movers.len(),
                    "movement join timed out with unfinished moves"
                );
            }
            bus.emit(TurnEvent::MovementComplete {
                finished,
                timed_out,
            });
            self.join = None;
            return true;
        }
        false
    }

    /// Hard stop: executing moves are dropped where they are.
    pub fn abort(&mut self, world: &mut World) {
        let Some(join) = self.join.take() else {
            return;
        };
        let mut orphaned = 0;
        for entity in join.movers {
            let executing = world
                .get::<&MoveOrder>(entity)
                .map(|order| order.state == MoveState::Executing)
                .unwrap_or(false);
            if executing {
                let _ = world.remove_one::<MoveOrder>(entity);
                orphaned += 1;
            }
        }
        if orphaned > 0 {
            warn!(orphaned, "moves abandoned mid-execution");
        }
    }

    pub fn is_moving(&self) -> bool {
        self.join.is_some()
    }
}

/// Remove every move order. Plans do not carry over between turns.
pub fn clear_orders(world: &mut World) {
    let entities: Vec<Entity> = world
        .query::<&MoveOrder>()
        .iter()
        .map(|(entity, _)| entity)
        .collect();
    for entity in entities {
        let _ = world.remove_one::<MoveOrder>(entity);
    }
}

/// Ship exists, is not destroyed and its drive works.
pub fn can_move(world: &World, entity: Entity) -> bool {
    world.get::<&Ship>(entity).is_ok()
        && world.get::<&Destroyed>(entity).is_err()
        && world.get::<&Immobilized>(entity).is_err()
}

/// The ship will follow its order's trajectory: a planned move that `begin`
/// will start, or an executing move whose drive still works.
fn follows_order(world: &World, entity: Entity, order: &MoveOrder) -> bool {
    match order.state {
        MoveState::Planned => can_move(world, entity),
        MoveState::Executing => world.get::<&Immobilized>(entity).is_err(),
        _ => false,
    }
}

/// Planned or executing move present that the ship will actually follow.
pub fn has_pending_move(world: &World, entity: Entity) -> bool {
    world
        .get::<&MoveOrder>(entity)
        .map(|order| follows_order(world, entity, &order))
        .unwrap_or(false)
}

pub fn is_executing_move(world: &World, entity: Entity) -> bool {
    world
        .get::<&MoveOrder>(entity)
        .map(|order| order.state == MoveState::Executing)
        .unwrap_or(false)
}

/// Predicted pose at normalized time `t`: the planned trajectory if the ship
/// will follow it, otherwise the current pose.
pub fn pose_at(world: &World, entity: Entity, t: f64) -> Option<Pose> {
    if let Ok(order) = world.get::<&MoveOrder>(entity) {
        if follows_order(world, entity, &order) {
            return Some(order.trajectory.pose_at(t.clamp(0.0, 1.0)));
        }
    }
    world.get::<&Pose>(entity).ok().map(|pose| *pose)
}

pub fn position_at(world: &World, entity: Entity, t: f64) -> Option<DVec3> {
    pose_at(world, entity, t).map(|pose| pose.position)
}

pub fn rotation_at(world: &World, entity: Entity, t: f64) -> Option<DQuat> {
    pose_at(world, entity, t).map(|pose| pose.rotation)
}

/// Step one executing move and write its pose. Immobilized ships hold still.
fn advance_move(world: &mut World, entity: Entity, dt: f64) {
    if world.get::<&Immobilized>(entity).is_ok() {
        return;
    }
    let Ok((order, pose)) = world.query_one_mut::<(&mut MoveOrder, &mut Pose)>(entity) else {
        return;
    };
    if order.state != MoveState::Executing {
        return;
    }
    order.elapsed_secs += dt;
    if order.elapsed_secs + TIME_EPSILON >= order.duration_secs {
        order.elapsed_secs = order.duration_secs;
        order.state = MoveState::Finished;
    }
    *pose = order.trajectory.pose_at(order.progress());
}

/// Despawned or no-longer-ordered movers count as finished.
fn move_finished(world: &World, entity: Entity) -> bool {
    world
        .get::<&MoveOrder>(entity)
        .map(|order| order.state == MoveState::Finished)
        .unwrap_or(true)
}

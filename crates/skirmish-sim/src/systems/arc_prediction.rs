//! Arc/range prediction for a weapon against a target over the Simulation
//! window.
//!
//! Pure reads of the world: both ships' pending trajectories are sampled at
//! evenly spaced normalized times, the mount's forward is recomputed from
//! the firing ship's orientation at each sample, and in-arc samples are
//! folded into firing windows. Range is checked once, at the chosen optimal
//! time.

use std::collections::HashMap;

use hecs::{Entity, World};

use skirmish_core::components::{Weapon, WeaponMount};
use skirmish_core::state::{ArcValidationResult, FiringWindow};
use skirmish_core::types::{angle_to_degrees, Pose};

use crate::ids::from_id;
use crate::systems::movement;

/// Weapon data needed for prediction, copied out of the world.
#[derive(Debug, Clone, Copy)]
struct MountInfo {
    ship: Entity,
    mount: WeaponMount,
    half_arc: f64,
    max_range: f64,
}

/// Cached predictions keyed by (weapon, target, samples).
///
/// Valid for one planning window; callers invalidate it whenever a movement
/// plan changes.
#[derive(Debug, Default)]
pub struct ArcCache {
    entries: HashMap<(Entity, Entity, u32), ArcValidationResult>,
}

/// Predict whether and when `target` will be inside `weapon`'s arc and range.
///
/// Never fails: missing entities produce a result with no firing time and an
/// explanatory message.
pub fn predict(world: &World, weapon: Entity, target: Entity, samples: u32) -> ArcValidationResult {
    let Some(info) = mount_info(world, weapon) else {
        return unavailable("weapon not found");
    };
    if world.get::<&Pose>(target).is_err() {
        return unavailable("target not found");
    }

    let static_case =
        !movement::has_pending_move(world, info.ship) && !movement::has_pending_move(world, target);
    if static_case {
        predict_static(world, &info, target)
    } else {
        predict_sampled(world, &info, target, samples.max(1))
    }
}

/// World pose of a weapon mount right now.
pub fn current_mount_pose(world: &World, weapon: Entity) -> Option<Pose> {
    let info = mount_info(world, weapon)?;
    let ship_pose = *world.get::<&Pose>(info.ship).ok()?;
    Some(compose(&ship_pose, &info.mount))
}

/// Angle (degrees) and distance from a mount pose to a point.
pub fn bearing_and_range(mount: &Pose, point: glam::DVec3) -> (f64, f64) {
    (
        angle_to_degrees(mount.forward(), mount.position, point),
        mount.range_to(point),
    )
}

fn predict_static(world: &World, info: &MountInfo, target: Entity) -> ArcValidationResult {
    let (Some(ship_pose), Some(target_pose)) = (
        movement::pose_at(world, info.ship, 0.0),
        movement::pose_at(world, target, 0.0),
    ) else {
        return unavailable("pose unavailable");
    };
    let mount = compose(&ship_pose, &info.mount);
    let (angle, distance) = bearing_and_range(&mount, target_pose.position);
    let in_arc = angle < info.half_arc;
    let in_range = distance <= info.max_range;

    if !in_arc {
        return ArcValidationResult {
            will_be_in_arc: false,
            optimal_firing_time: None,
            min_angle_degrees: angle,
            firing_windows: Vec::new(),
            in_range_at_optimal: false,
            message: format!(
                "target {angle:.1}° off the mount, arc half-angle {:.1}°",
                info.half_arc
            ),
        };
    }

    ArcValidationResult {
        will_be_in_arc: true,
        optimal_firing_time: Some(0.0),
        min_angle_degrees: angle,
        firing_windows: vec![FiringWindow {
            start: 0.0,
            end: 1.0,
        }],
        in_range_at_optimal: in_range,
        message: range_message(0.0, distance, info.max_range),
    }
}

fn predict_sampled(
    world: &World,
    info: &MountInfo,
    target: Entity,
    samples: u32,
) -> ArcValidationResult {
    let mut min_angle = f64::INFINITY;
    let mut optimal: Option<(f64, f64)> = None; // (t, angle)
    let mut windows = Vec::new();
    let mut open: Option<f64> = None;
    let mut previous_t = 0.0;

    for i in 0..=samples {
        let t = f64::from(i) / f64::from(samples);
        let (Some(ship_pose), Some(target_pose)) = (
            movement::pose_at(world, info.ship, t),
            movement::pose_at(world, target, t),
        ) else {
            return unavailable("pose unavailable");
        };
        let mount = compose(&ship_pose, &info.mount);
        let angle = angle_to_degrees(mount.forward(), mount.position, target_pose.position);
        let in_arc = angle < info.half_arc;

        min_angle = min_angle.min(angle);

        if in_arc {
            // Strictly smaller wins: the earliest sample of a plateau is kept.
            if optimal.map_or(true, |(_, best)| angle < best) {
                optimal = Some((t, angle));
            }
            if open.is_none() {
                // A run that starts on the last sample would be zero-length;
                // start it halfway back to the previous sample instead.
                open = Some(if i == samples && i > 0 {
                    (previous_t + t) * 0.5
                } else {
                    t
                });
            }
        } else if let Some(start) = open.take() {
            windows.push(FiringWindow { start, end: t });
        }
        previous_t = t;
    }
    if let Some(start) = open {
        windows.push(FiringWindow { start, end: 1.0 });
    }

    let Some((t_opt, _)) = optimal else {
        return ArcValidationResult {
            will_be_in_arc: false,
            optimal_firing_time: None,
            min_angle_degrees: min_angle,
            firing_windows: windows,
            in_range_at_optimal: false,
            message: format!(
                "never in arc, closest {min_angle:.1}° against half-angle {:.1}°",
                info.half_arc
            ),
        };
    };

    let distance = match (
        movement::pose_at(world, info.ship, t_opt),
        movement::pose_at(world, target, t_opt),
    ) {
        (Some(ship_pose), Some(target_pose)) => {
            compose(&ship_pose, &info.mount).range_to(target_pose.position)
        }
        _ => f64::INFINITY,
    };

    ArcValidationResult {
        will_be_in_arc: true,
        optimal_firing_time: Some(t_opt),
        min_angle_degrees: min_angle,
        firing_windows: windows,
        in_range_at_optimal: distance <= info.max_range,
        message: range_message(t_opt, distance, info.max_range),
    }
}

fn mount_info(world: &World, weapon: Entity) -> Option<MountInfo> {
    let w = world.get::<&Weapon>(weapon).ok()?;
    let mount = *world.get::<&WeaponMount>(weapon).ok()?;
    let ship = from_id(mount.ship)?;
    Some(MountInfo {
        ship,
        mount,
        half_arc: w.half_arc_degrees(),
        max_range: w.max_range,
    })
}

fn compose(ship: &Pose, mount: &WeaponMount) -> Pose {
    Pose::new(ship.transform_point(mount.offset), ship.rotation * mount.facing)
}

fn range_message(t: f64, distance: f64, max_range: f64) -> String {
    if distance <= max_range {
        format!("in arc and in range at t={t:.2} ({distance:.1} / {max_range:.1})")
    } else {
        format!("in arc at t={t:.2} but out of range ({distance:.1} > {max_range:.1})")
    }
}

fn unavailable(reason: &str) -> ArcValidationResult {
    ArcValidationResult {
        min_angle_degrees: f64::INFINITY,
        message: reason.to_string(),
        ..Default::default()
    }
}

impl ArcCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get_or_predict(
        &mut self,
        world: &World,
        weapon: Entity,
        target: Entity,
        samples: u32,
    ) -> ArcValidationResult {
        self.entries
            .entry((weapon, target, samples))
            .or_insert_with(|| predict(world, weapon, target, samples))
            .clone()
    }

    pub fn invalidate_all(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

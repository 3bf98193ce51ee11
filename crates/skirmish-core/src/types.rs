//! Fundamental geometric and simulation types.

use glam::{DQuat, DVec3};
use serde::{Deserialize, Serialize};

/// Opaque entity reference used on the wire (commands, events, snapshots).
///
/// The simulation crate maps this to and from its ECS entity handles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EntityId(pub u64);

/// Position plus orientation of an entity at one instant.
///
/// Forward is local +Z, up is local +Y.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Pose {
    pub position: DVec3,
    pub rotation: DQuat,
}

/// Simulation time tracking.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct SimTime {
    /// Number of steps taken (increments by 1 each advance).
    pub tick: u64,
    /// Elapsed simulation time in seconds.
    pub elapsed_secs: f64,
}

impl Pose {
    pub fn new(position: DVec3, rotation: DQuat) -> Self {
        Self { position, rotation }
    }

    /// Pose at `position` facing along local +Z.
    pub fn at(position: DVec3) -> Self {
        Self::new(position, DQuat::IDENTITY)
    }

    /// World-space forward direction.
    pub fn forward(&self) -> DVec3 {
        self.rotation * DVec3::Z
    }

    /// Transform a point from this pose's local frame into world space.
    pub fn transform_point(&self, local: DVec3) -> DVec3 {
        self.position + self.rotation * local
    }

    /// Range to a world-space point.
    pub fn range_to(&self, point: DVec3) -> f64 {
        self.position.distance(point)
    }
}

impl Default for Pose {
    fn default() -> Self {
        Self::at(DVec3::ZERO)
    }
}

impl SimTime {
    /// Seconds per step at the default tick rate.
    pub fn dt(&self) -> f64 {
        crate::constants::DT
    }

    /// Advance by one step of `dt` seconds.
    pub fn advance(&mut self, dt: f64) {
        self.tick += 1;
        self.elapsed_secs += dt;
    }
}

/// Angle in degrees between a direction and the vector towards `to`.
///
/// A degenerate (zero-length) offset counts as dead ahead.
pub fn angle_to_degrees(forward: DVec3, from: DVec3, to: DVec3) -> f64 {
    let offset = to - from;
    if offset.length_squared() <= f64::EPSILON || forward.length_squared() <= f64::EPSILON {
        return 0.0;
    }
    forward.angle_between(offset).to_degrees()
}

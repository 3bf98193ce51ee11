//! Trajectory sampling seam.
//!
//! Ship motion is owned by the host; the engine only needs to sample a
//! planned path at normalized time `t` in `[0, 1]`. Hosts implement
//! [`Trajectory`] for their own path representation. Two simple
//! implementations are provided for tooling and tests.

use glam::{DQuat, DVec3};

use crate::types::Pose;

/// A planned path sampled by normalized time.
///
/// Implementations must be pure: the same `t` always yields the same pose.
/// Callers clamp `t` to `[0, 1]` before sampling.
pub trait Trajectory: Send + Sync {
    fn position_at(&self, t: f64) -> DVec3;
    fn rotation_at(&self, t: f64) -> DQuat;

    fn pose_at(&self, t: f64) -> Pose {
        Pose::new(self.position_at(t), self.rotation_at(t))
    }
}

/// Holds a single pose for the whole window.
#[derive(Debug, Clone, Copy)]
pub struct StationaryTrajectory {
    pub pose: Pose,
}

/// Straight-line translation with a spherical rotation blend.
#[derive(Debug, Clone, Copy)]
pub struct LinearTrajectory {
    pub from: Pose,
    pub to: Pose,
}

impl StationaryTrajectory {
    pub fn new(pose: Pose) -> Self {
        Self { pose }
    }
}

impl LinearTrajectory {
    pub fn new(from: Pose, to: Pose) -> Self {
        Self { from, to }
    }
}

impl Trajectory for StationaryTrajectory {
    fn position_at(&self, _t: f64) -> DVec3 {
        self.pose.position
    }

    fn rotation_at(&self, _t: f64) -> DQuat {
        self.pose.rotation
    }
}

impl Trajectory for LinearTrajectory {
    fn position_at(&self, t: f64) -> DVec3 {
        self.from.position.lerp(self.to.position, t.clamp(0.0, 1.0))
    }

    fn rotation_at(&self, t: f64) -> DQuat {
        self.from.rotation.slerp(self.to.rotation, t.clamp(0.0, 1.0))
    }
}

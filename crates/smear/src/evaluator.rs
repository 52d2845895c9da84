//! Per-vertex smear update.
//!
//! Each vertex is evaluated independently from its goal position, last
//! frame's goal, and its current lag position:
//!
//! 1. The lag offset is rescaled by how far the goal's speed exceeds the
//!    minimum smear velocity (capped at the maximum). A stationary goal or a
//!    speed at or below the minimum snaps the lag onto the goal.
//! 2. Vertices facing along their velocity, painted to zero, or not moving
//!    are culled and output their goal unchanged.
//! 3. Trailing vertices close the gap by the smear rate, then the offset is
//!    scaled by how strongly the surface faces away from the motion.

use glam::{DMat4, DVec3};
use meshblur_config::SmearParams;

use crate::snapshot::FrameInputSnapshot;

/// Inputs of one vertex for one frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexInput {
    pub goal_local: DVec3,
    pub previous_goal_world: DVec3,
    pub lagged_world: DVec3,
    /// Painted weight already scaled by the envelope
    pub weight: f32,
    /// Local-space surface normal
    pub normal: DVec3,
}

/// Result of evaluating one vertex.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct VertexUpdate {
    /// Goal transformed to world space (becomes next frame's previous goal)
    pub goal_world: DVec3,
    /// Deformed world position, carried as the lag for the next frame
    pub lagged_world: DVec3,
    /// Weighted output position in local space
    pub output_local: DVec3,
    /// Whether the angle-based offset was applied
    pub smeared: bool,
}

/// Frame-constant part of the smear computation.
#[derive(Debug, Clone, Copy)]
pub struct SmearEvaluator {
    local_to_world: DMat4,
    world_to_local: Option<DMat4>,
    smear_rate: f64,
    min_smear_velocity: f64,
    max_smear_velocity: f64,
    normal_offset: f64,
    angle_magnitude: f64,
}

impl SmearEvaluator {
    /// `world_to_local` is `None` for a singular transform; smeared
    /// vertices then keep their goal position in local space.
    pub fn new(
        local_to_world: DMat4,
        world_to_local: Option<DMat4>,
        params: &SmearParams,
    ) -> Self {
        Self {
            local_to_world,
            world_to_local,
            smear_rate: params.smear_rate(),
            min_smear_velocity: params.min_smear_velocity,
            max_smear_velocity: params.max_smear_velocity,
            normal_offset: f64::from(params.normal_offset),
            angle_magnitude: f64::from(params.angle_magnitude),
        }
    }

    pub fn from_snapshot(snapshot: &FrameInputSnapshot) -> Self {
        Self::new(
            snapshot.local_to_world(),
            snapshot.world_to_local(),
            snapshot.params(),
        )
    }

    pub fn smear_rate(&self) -> f64 {
        self.smear_rate
    }

    /// Scale applied to the lag offset for a given velocity/normal dot
    /// product. Saturates at 1.0; there is no lower bound, so a negative
    /// magnitude pushes the point ahead of its goal.
    pub fn facing_factor(&self, dot: f64) -> f64 {
        ((-dot + self.normal_offset) * self.angle_magnitude).min(1.0)
    }

    /// Evaluate one vertex.
    pub fn evaluate(&self, vertex: &VertexInput) -> VertexUpdate {
        let goal_world = self.local_to_world.transform_point3(vertex.goal_local);

        let velocity_dir = (goal_world - vertex.lagged_world).normalize_or_zero();
        let goal_speed = (goal_world - vertex.previous_goal_world).length();

        let mut lagged = vertex.lagged_world;
        if goal_speed == 0.0 {
            lagged = goal_world;
        } else {
            let delta = goal_speed - self.min_smear_velocity;
            if delta > 0.0 {
                let delta = delta.min(self.max_smear_velocity);
                lagged = goal_world + (lagged - goal_world) * (delta / goal_speed);
            } else {
                lagged = goal_world;
            }
        }

        let dot = velocity_dir.dot(vertex.normal);
        if vertex.weight == 0.0 || dot >= 0.0 || goal_speed == 0.0 {
            return VertexUpdate {
                goal_world,
                lagged_world: goal_world,
                output_local: vertex.goal_local,
                smeared: false,
            };
        }

        lagged += (goal_world - lagged) * self.smear_rate;
        let deformed_world = goal_world + (lagged - goal_world) * self.facing_factor(dot);

        let output_local = match self.world_to_local {
            Some(world_to_local) => {
                let deformed_local = world_to_local.transform_point3(deformed_world);
                vertex.goal_local + (deformed_local - vertex.goal_local) * f64::from(vertex.weight)
            }
            None => vertex.goal_local,
        };

        VertexUpdate {
            goal_world,
            lagged_world: deformed_world,
            output_local,
            smeared: true,
        }
    }
}

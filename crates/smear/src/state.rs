//! Persistent per-deformer smear state.
//!
//! Holds last frame's goal positions and the current lagged positions, both
//! in world space, along with the last evaluated frame. One instance belongs
//! to exactly one deformer and is only touched between evaluations.

use glam::DVec3;

/// Why the state was reinitialized to the current goal.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ResetReason {
    /// First evaluation of this deformer
    Uninitialized,
    /// Frame delta since the last evaluation was neither 0 nor 1
    TimeDiscontinuity { delta: f64 },
    /// Current frame precedes the configured start frame
    BeforeStartFrame,
    /// The mesh reports a different vertex count than the stored state
    VertexCountChanged { previous: usize, current: usize },
}

/// Lag state carried from one evaluated frame to the next.
#[derive(Debug, Clone, Default)]
pub struct VertexSmearState {
    previous_goal_world: Vec<DVec3>,
    current_lagged_world: Vec<DVec3>,
    previous_time: f64,
    initialized: bool,
}

impl VertexSmearState {
    /// Create an empty, uninitialized state.
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_initialized(&self) -> bool {
        self.initialized
    }

    /// Frame number of the last committed evaluation.
    pub fn previous_time(&self) -> f64 {
        self.previous_time
    }

    /// Number of vertices tracked (0 until initialized).
    pub fn vertex_count(&self) -> usize {
        self.previous_goal_world.len()
    }

    pub fn previous_goal_world(&self) -> &[DVec3] {
        &self.previous_goal_world
    }

    pub fn current_lagged_world(&self) -> &[DVec3] {
        &self.current_lagged_world
    }

    /// Decide whether evaluating `time` must start from a fresh state.
    ///
    /// Re-evaluating the same frame and stepping one frame are contiguous;
    /// every other delta is treated as a scrub or jump.
    pub fn reset_reason(
        &self,
        time: f64,
        start_frame: i32,
        vertex_count: usize,
    ) -> Option<ResetReason> {
        if !self.initialized {
            return Some(ResetReason::Uninitialized);
        }

        let delta = (time - self.previous_time).abs();
        if delta != 1.0 && delta != 0.0 {
            return Some(ResetReason::TimeDiscontinuity {
                delta: time - self.previous_time,
            });
        }

        if time < f64::from(start_frame) {
            return Some(ResetReason::BeforeStartFrame);
        }

        if self.vertex_count() != vertex_count {
            return Some(ResetReason::VertexCountChanged {
                previous: self.vertex_count(),
                current: vertex_count,
            });
        }

        None
    }

    /// Reinitialize to the given world-space goal with zero lag.
    pub fn reset(&mut self, goal_world: &[DVec3]) {
        self.previous_goal_world = goal_world.to_vec();
        self.current_lagged_world = goal_world.to_vec();
        self.initialized = true;
    }

    /// Store the results of a completed evaluation for the next frame.
    pub(crate) fn commit(&mut self, goal_world: Vec<DVec3>, lagged_world: Vec<DVec3>, time: f64) {
        debug_assert_eq!(goal_world.len(), lagged_world.len());
        self.previous_goal_world = goal_world;
        self.current_lagged_world = lagged_world;
        self.previous_time = time;
        self.initialized = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn initialized_at(time: f64, count: usize) -> VertexSmearState {
        let mut state = VertexSmearState::new();
        let goal = vec![DVec3::ZERO; count];
        state.commit(goal.clone(), goal, time);
        state
    }

    #[test]
    fn test_new_state_is_uninitialized() {
        let state = VertexSmearState::new();
        assert!(!state.is_initialized());
        assert_eq!(state.vertex_count(), 0);
        assert_eq!(
            state.reset_reason(0.0, 0, 0),
            Some(ResetReason::Uninitialized)
        );
    }

    #[test]
    fn test_contiguous_frames_do_not_reset() {
        let state = initialized_at(10.0, 3);
        assert_eq!(state.reset_reason(10.0, 0, 3), None);
        assert_eq!(state.reset_reason(11.0, 0, 3), None);
    }

    #[test]
    fn test_time_jump_resets() {
        let state = initialized_at(10.0, 3);
        assert_eq!(
            state.reset_reason(50.0, 0, 3),
            Some(ResetReason::TimeDiscontinuity { delta: 40.0 })
        );
        assert_eq!(
            state.reset_reason(10.5, 0, 3),
            Some(ResetReason::TimeDiscontinuity { delta: 0.5 })
        );
    }

    #[test]
    fn test_single_step_back_is_contiguous() {
        let state = initialized_at(10.0, 3);
        assert_eq!(state.reset_reason(9.0, 0, 3), None);
    }

    #[test]
    fn test_before_start_frame_resets() {
        let state = initialized_at(4.0, 3);
        assert_eq!(
            state.reset_reason(5.0, 10, 3),
            Some(ResetReason::BeforeStartFrame)
        );
        assert_eq!(state.reset_reason(5.0, 5, 3), None);
    }

    #[test]
    fn test_vertex_count_change_resets() {
        let state = initialized_at(1.0, 3);
        assert_eq!(
            state.reset_reason(2.0, 0, 4),
            Some(ResetReason::VertexCountChanged {
                previous: 3,
                current: 4
            })
        );
    }

    #[test]
    fn test_reset_copies_goal_into_both_buffers() {
        let mut state = VertexSmearState::new();
        let goal = vec![DVec3::new(1.0, 2.0, 3.0), DVec3::new(-1.0, 0.0, 0.5)];
        state.reset(&goal);

        assert!(state.is_initialized());
        assert_eq!(state.previous_goal_world(), goal.as_slice());
        assert_eq!(state.current_lagged_world(), goal.as_slice());
        // Reset alone does not advance time
        assert_eq!(state.previous_time(), 0.0);
    }
}

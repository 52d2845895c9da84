//! Deformer orchestration.
//!
//! One evaluation runs as:
//! 1. Envelope check (zero → passthrough, nothing touched)
//! 2. Pull the frame's snapshot from the provider
//! 3. Decide whether the lag state restarts from the current goal
//! 4. Dispatch the per-vertex update over the worker pool and join
//! 5. Hand positions to the sink, then commit state for the next frame
//!
//! State is only written in step 5, so any failure before it leaves the
//! deformer exactly as it was.

use glam::DVec3;
use meshblur_config::DispatchConfig;
use tracing::debug;

use crate::dispatch::{DispatchOutput, ParallelDispatcher};
use crate::error::SmearError;
use crate::evaluator::SmearEvaluator;
use crate::io::{InputProvider, OutputSink};
use crate::pool::WorkerPool;
use crate::snapshot::FrameInputSnapshot;
use crate::state::{ResetReason, VertexSmearState};

/// Summary of one completed evaluation.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvaluationReport {
    pub time: f64,
    pub vertex_count: usize,
    /// Set when the lag state restarted from the goal this frame
    pub reset: Option<ResetReason>,
    pub smeared_vertices: usize,
    pub task_count: usize,
}

/// What `deform` did with the frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum EvaluationOutcome {
    /// Envelope was zero; the sink was not written and state is unchanged
    Passthrough,
    Deformed(EvaluationReport),
}

/// Results computed for a frame but not yet committed.
struct PendingFrame {
    output: DispatchOutput,
    report: EvaluationReport,
}

/// A motion smear deformer attached to one mesh.
///
/// Owns the lag state exclusively and a handle to the shared worker pool,
/// released when the deformer is dropped.
#[derive(Debug)]
pub struct DeformerNode {
    state: VertexSmearState,
    dispatcher: ParallelDispatcher,
    pool: WorkerPool,
}

impl DeformerNode {
    /// Create a deformer with the default dispatch configuration.
    pub fn new() -> Result<Self, SmearError> {
        Self::with_config(&DispatchConfig::default())
    }

    pub fn with_config(config: &DispatchConfig) -> Result<Self, SmearError> {
        Ok(Self {
            state: VertexSmearState::new(),
            dispatcher: ParallelDispatcher::from_config(config),
            pool: WorkerPool::acquire(config)?,
        })
    }

    pub fn state(&self) -> &VertexSmearState {
        &self.state
    }

    pub fn dispatcher(&self) -> &ParallelDispatcher {
        &self.dispatcher
    }

    /// Change how many ranges the vertex set is split into.
    pub fn set_task_count(&mut self, task_count: usize) {
        self.dispatcher = ParallelDispatcher::new(task_count);
    }

    /// Evaluate one frame and return the deformed local positions.
    ///
    /// With a zero envelope the goal positions are returned unchanged and
    /// the state is left untouched.
    pub fn evaluate(&mut self, snapshot: &FrameInputSnapshot) -> Result<Vec<DVec3>, SmearError> {
        if snapshot.envelope() == 0.0 {
            return Ok(snapshot.goal_local().to_vec());
        }

        let pending = self.compute(snapshot)?;
        Ok(self.commit(pending, snapshot.time()))
    }

    /// Pull input from `provider`, evaluate, and write into `sink`.
    ///
    /// Provider and sink failures are returned unchanged with no state
    /// mutation.
    pub fn deform<P, S>(&mut self, provider: &P, sink: &mut S) -> Result<EvaluationOutcome, SmearError>
    where
        P: InputProvider + ?Sized,
        S: OutputSink + ?Sized,
    {
        if provider.envelope() == 0.0 {
            debug!("deform: envelope is zero, skipping");
            return Ok(EvaluationOutcome::Passthrough);
        }

        let snapshot = provider.frame_input()?;
        if snapshot.envelope() == 0.0 {
            return Ok(EvaluationOutcome::Passthrough);
        }

        let pending = self.compute(&snapshot)?;
        sink.write_positions(&pending.output.output_local)?;

        let report = pending.report;
        self.commit(pending, snapshot.time());
        Ok(EvaluationOutcome::Deformed(report))
    }

    fn compute(&self, snapshot: &FrameInputSnapshot) -> Result<PendingFrame, SmearError> {
        let vertex_count = snapshot.vertex_count();
        let reset = self.state.reset_reason(
            snapshot.time(),
            snapshot.params().start_frame,
            vertex_count,
        );

        let fresh_goal;
        let (previous_goal_world, lagged_world) = if reset.is_some() {
            fresh_goal = snapshot.goal_world();
            (fresh_goal.as_slice(), fresh_goal.as_slice())
        } else {
            (
                self.state.previous_goal_world(),
                self.state.current_lagged_world(),
            )
        };

        let evaluator = SmearEvaluator::from_snapshot(snapshot);
        let output = self.dispatcher.dispatch(
            &self.pool,
            &evaluator,
            snapshot,
            previous_goal_world,
            lagged_world,
        )?;

        debug!(
            "deform: frame={} vertices={} reset={:?} smeared={}",
            snapshot.time(),
            vertex_count,
            reset,
            output.smeared
        );

        let report = EvaluationReport {
            time: snapshot.time(),
            vertex_count,
            reset,
            smeared_vertices: output.smeared,
            task_count: self.dispatcher.task_count(),
        };
        Ok(PendingFrame { output, report })
    }

    fn commit(&mut self, pending: PendingFrame, time: f64) -> Vec<DVec3> {
        let DispatchOutput {
            goal_world,
            lagged_world,
            output_local,
            ..
        } = pending.output;
        self.state.commit(goal_world, lagged_world, time);
        output_local
    }
}

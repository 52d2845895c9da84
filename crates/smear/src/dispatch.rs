//! Fork-join dispatch of the per-vertex update over contiguous ranges.
//!
//! The vertex range is split into `task_count` contiguous ranges of
//! `ceil(n / task_count)` vertices; the last range ends at `n`, and trailing
//! ranges are empty when there are fewer vertices than tasks. Each vertex
//! reads and writes only its own slots, so ranges run without locking. All
//! ranges join before results are returned.

use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};

use glam::DVec3;
use meshblur_config::DispatchConfig;
use rayon::prelude::*;
use tracing::{trace, warn};

use crate::error::SmearError;
use crate::evaluator::{SmearEvaluator, VertexInput, VertexUpdate};
use crate::pool::WorkerPool;
use crate::snapshot::FrameInputSnapshot;

/// Per-vertex results of one dispatch, in vertex order.
#[derive(Debug, Clone, Default)]
pub struct DispatchOutput {
    pub goal_world: Vec<DVec3>,
    pub lagged_world: Vec<DVec3>,
    pub output_local: Vec<DVec3>,
    /// Vertices that received the angle-based offset
    pub smeared: usize,
}

impl DispatchOutput {
    fn from_updates(updates: Vec<VertexUpdate>) -> Self {
        let mut output = Self {
            goal_world: Vec::with_capacity(updates.len()),
            lagged_world: Vec::with_capacity(updates.len()),
            output_local: Vec::with_capacity(updates.len()),
            smeared: 0,
        };
        for update in updates {
            output.goal_world.push(update.goal_world);
            output.lagged_world.push(update.lagged_world);
            output.output_local.push(update.output_local);
            output.smeared += usize::from(update.smeared);
        }
        output
    }
}

/// Splits the vertex range into a fixed number of tasks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParallelDispatcher {
    task_count: usize,
}

impl Default for ParallelDispatcher {
    fn default() -> Self {
        Self::from_config(&DispatchConfig::default())
    }
}

impl ParallelDispatcher {
    /// Create a dispatcher; a task count of 0 is treated as 1.
    pub fn new(task_count: usize) -> Self {
        Self {
            task_count: task_count.max(1),
        }
    }

    pub fn from_config(config: &DispatchConfig) -> Self {
        Self::new(config.effective_task_count())
    }

    pub fn task_count(&self) -> usize {
        self.task_count
    }

    /// Vertices per task (the last task may receive fewer).
    pub fn chunk_len(&self, vertex_count: usize) -> usize {
        vertex_count.div_ceil(self.task_count)
    }

    /// Contiguous index ranges, one per task.
    pub fn partition(&self, vertex_count: usize) -> Vec<Range<usize>> {
        let len = self.chunk_len(vertex_count);
        (0..self.task_count)
            .map(|task| {
                let start = (task * len).min(vertex_count);
                let end = if task + 1 == self.task_count {
                    vertex_count
                } else {
                    (start + len).min(vertex_count)
                };
                start..end
            })
            .collect()
    }

    /// Evaluate every vertex on the worker pool and join.
    ///
    /// `previous_goal_world` and `lagged_world` are the state the frame
    /// starts from; neither is modified.
    pub fn dispatch(
        &self,
        pool: &WorkerPool,
        evaluator: &SmearEvaluator,
        snapshot: &FrameInputSnapshot,
        previous_goal_world: &[DVec3],
        lagged_world: &[DVec3],
    ) -> Result<DispatchOutput, SmearError> {
        check_state(snapshot, previous_goal_world, lagged_world)?;
        let vertex_count = snapshot.vertex_count();
        if vertex_count == 0 {
            return Ok(DispatchOutput::default());
        }

        trace!(
            "dispatch: {} vertices over {} tasks of {}",
            vertex_count,
            self.task_count,
            self.chunk_len(vertex_count)
        );

        let updates = self.run_tasks(pool, vertex_count, |i| {
            evaluator.evaluate(&vertex_input(snapshot, previous_goal_world, lagged_world, i))
        })?;
        Ok(DispatchOutput::from_updates(updates))
    }

    /// Evaluate the same ranges on the calling thread.
    pub fn dispatch_serial(
        &self,
        evaluator: &SmearEvaluator,
        snapshot: &FrameInputSnapshot,
        previous_goal_world: &[DVec3],
        lagged_world: &[DVec3],
    ) -> Result<DispatchOutput, SmearError> {
        check_state(snapshot, previous_goal_world, lagged_world)?;

        let updates = self
            .partition(snapshot.vertex_count())
            .into_iter()
            .flatten()
            .map(|i| evaluator.evaluate(&vertex_input(snapshot, previous_goal_world, lagged_world, i)))
            .collect();
        Ok(DispatchOutput::from_updates(updates))
    }

    /// Run `kernel` for every index, one rayon job per range, and join.
    ///
    /// A panic in any job is caught at the join and reported as a
    /// `ConcurrencyFault`.
    fn run_tasks<F>(
        &self,
        pool: &WorkerPool,
        vertex_count: usize,
        kernel: F,
    ) -> Result<Vec<VertexUpdate>, SmearError>
    where
        F: Fn(usize) -> VertexUpdate + Sync,
    {
        let mut updates = vec![EMPTY_UPDATE; vertex_count];
        let ranges = self.partition(vertex_count);
        let tasks = split_by_ranges(&mut updates, &ranges);

        let joined = panic::catch_unwind(AssertUnwindSafe(|| {
            pool.install(|| {
                tasks.into_par_iter().for_each(|(start, slots)| {
                    for (offset, slot) in slots.iter_mut().enumerate() {
                        *slot = kernel(start + offset);
                    }
                });
            })
        }));

        if let Err(payload) = joined {
            let message = panic_message(payload.as_ref());
            warn!("dispatch: worker task failed: {}", message);
            return Err(SmearError::ConcurrencyFault(message));
        }

        Ok(updates)
    }
}

const EMPTY_UPDATE: VertexUpdate = VertexUpdate {
    goal_world: DVec3::ZERO,
    lagged_world: DVec3::ZERO,
    output_local: DVec3::ZERO,
    smeared: false,
};

fn vertex_input(
    snapshot: &FrameInputSnapshot,
    previous_goal_world: &[DVec3],
    lagged_world: &[DVec3],
    i: usize,
) -> VertexInput {
    VertexInput {
        goal_local: snapshot.goal_local()[i],
        previous_goal_world: previous_goal_world[i],
        lagged_world: lagged_world[i],
        weight: snapshot.weight(i),
        normal: snapshot.normals()[i],
    }
}

fn check_state(
    snapshot: &FrameInputSnapshot,
    previous_goal_world: &[DVec3],
    lagged_world: &[DVec3],
) -> Result<(), SmearError> {
    let expected = snapshot.vertex_count();
    for (field, actual) in [
        ("previous_goal_world", previous_goal_world.len()),
        ("lagged_world", lagged_world.len()),
    ] {
        if actual != expected {
            return Err(SmearError::LengthMismatch {
                field,
                expected,
                actual,
            });
        }
    }
    Ok(())
}

/// Carve `slice` into disjoint mutable pieces matching `ranges`, paired with
/// each range's start index. Ranges must be contiguous from 0.
fn split_by_ranges<'a, T>(
    mut slice: &'a mut [T],
    ranges: &[Range<usize>],
) -> Vec<(usize, &'a mut [T])> {
    let mut pieces = Vec::with_capacity(ranges.len());
    for range in ranges {
        let (head, tail) = std::mem::take(&mut slice).split_at_mut(range.len());
        pieces.push((range.start, head));
        slice = tail;
    }
    pieces
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic".to_string()
    }
}

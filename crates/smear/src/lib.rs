//! Motion smear deformation for animated meshes.
//!
//! Each frame, every vertex trails behind its animated (goal) position by a
//! lag that is carried from frame to frame, producing a smear on the
//! surfaces facing away from the motion.
//!
//! # Architecture
//!
//! - **State**: per-deformer lag memory and the reset policy for
//!   discontinuous time
//! - **Snapshot**: immutable per-frame input bundle
//! - **Evaluator**: the per-vertex update
//! - **Dispatch**: contiguous-range fork-join over the shared worker pool
//! - **Deformer**: orchestrates snapshot → dispatch → sink → state commit

pub mod deformer;
pub mod dispatch;
pub mod error;
pub mod evaluator;
pub mod io;
pub mod pool;
pub mod snapshot;
pub mod state;

pub use deformer::{DeformerNode, EvaluationOutcome, EvaluationReport};
pub use dispatch::{DispatchOutput, ParallelDispatcher};
pub use error::SmearError;
pub use evaluator::{SmearEvaluator, VertexInput, VertexUpdate};
pub use io::{flatten_positions, InputProvider, OutputSink};
pub use pool::WorkerPool;
pub use snapshot::FrameInputSnapshot;
pub use state::{ResetReason, VertexSmearState};

pub use meshblur_config::{DispatchConfig, SmearParams};

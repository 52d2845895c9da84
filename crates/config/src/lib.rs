//! Shared configuration for the mesh blur deformer
//!
//! This crate provides the single source of truth for the deformer's
//! parameter table: defaults, constraints, and the read-only parameter
//! schema every deformer instance is described by.

mod schema;

pub use schema::{parameter_schema, ParameterKind, ParameterSpec};

use serde::{Deserialize, Serialize};

#[cfg(feature = "bevy")]
use bevy::prelude::Resource;

/// Default frame before which smear is suppressed
pub const DEFAULT_START_FRAME: i32 = 0;

/// Default number of frames the lag takes to catch up
pub const DEFAULT_SMEAR_FRAMES: i32 = 1;

/// Upper bound accepted for `smear_frames`
pub const MAX_SMEAR_FRAMES: i32 = 100;

/// Default velocity cap for lag-magnitude scaling
pub const DEFAULT_MAX_SMEAR_VELOCITY: f64 = 5.0;

/// Default number of contiguous vertex ranges per evaluation
pub const DEFAULT_TASK_COUNT: usize = 16;

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration JSON: {0}")]
    Json(#[from] serde_json::Error),
}

/// Scalar smear parameters shared by every vertex of one evaluation.
///
/// Frame time is not part of this table; it arrives with each frame's input.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default, rename_all = "camelCase")]
pub struct SmearParams {
    /// Smear is suppressed (state held at the goal) before this frame
    pub start_frame: i32,
    /// Inverse of the smear rate; values below 1 behave as 1
    pub smear_frames: i32,
    /// Additive bias applied to the facing term before the clamp
    pub normal_offset: f32,
    /// Multiplier on the facing term
    pub angle_magnitude: f32,
    /// Goal speed below which no smear occurs
    pub min_smear_velocity: f64,
    /// Cap on the speed excess used to scale the lag
    pub max_smear_velocity: f64,
    /// Global blend factor, 0 = passthrough
    pub envelope: f32,
}

impl Default for SmearParams {
    fn default() -> Self {
        Self {
            start_frame: DEFAULT_START_FRAME,
            smear_frames: DEFAULT_SMEAR_FRAMES,
            normal_offset: 0.0,
            angle_magnitude: 1.0,
            min_smear_velocity: 0.0,
            max_smear_velocity: DEFAULT_MAX_SMEAR_VELOCITY,
            envelope: 1.0,
        }
    }
}

impl SmearParams {
    /// Fraction of the remaining lag gap closed per frame.
    pub fn smear_rate(&self) -> f64 {
        1.0 / f64::from(self.smear_frames.max(1))
    }

    /// Clamp every field into the range declared by the parameter schema.
    ///
    /// Hosts apply this when a value is edited, the same way attribute
    /// min/max limits are enforced on user input.
    pub fn sanitized(&self) -> Self {
        let float = |name: &str, value: f32| clamp_to(name, f64::from(value)) as f32;
        Self {
            start_frame: clamp_to("startFrame", f64::from(self.start_frame)) as i32,
            smear_frames: clamp_to("smearFrames", f64::from(self.smear_frames)) as i32,
            normal_offset: float("normalOffset", self.normal_offset),
            angle_magnitude: float("angleMagnitude", self.angle_magnitude),
            min_smear_velocity: clamp_to("minSmearVelocity", self.min_smear_velocity),
            max_smear_velocity: clamp_to("maxSmearVelocity", self.max_smear_velocity),
            envelope: float("envelope", self.envelope),
        }
    }

    /// Load parameters from a (possibly partial) JSON document.
    ///
    /// Missing keys take their defaults; the result is sanitized.
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let params: Self = serde_json::from_str(json)?;
        Ok(params.sanitized())
    }
}

/// Clamp `value` into the schema range of parameter `name`.
pub fn clamp_to(name: &str, value: f64) -> f64 {
    ParameterSpec::lookup(name).map_or(value, |spec| spec.clamp(value))
}

/// Parallel dispatch configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "bevy", derive(Resource))]
#[serde(default, rename_all = "camelCase")]
pub struct DispatchConfig {
    /// Number of contiguous vertex ranges evaluated concurrently
    pub task_count: usize,
    /// Worker threads for the shared pool (None = one per core)
    pub worker_threads: Option<usize>,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            task_count: DEFAULT_TASK_COUNT,
            worker_threads: None,
        }
    }
}

impl DispatchConfig {
    /// Create a dispatch config with the given task count
    pub fn with_task_count(task_count: usize) -> Self {
        Self {
            task_count,
            ..Self::default()
        }
    }

    /// Task count with 0 treated as a single task
    pub fn effective_task_count(&self) -> usize {
        self.task_count.max(1)
    }

    /// Load dispatch settings from a (possibly partial) JSON document
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_params() {
        let params = SmearParams::default();
        assert_eq!(params.start_frame, 0);
        assert_eq!(params.smear_frames, 1);
        assert_eq!(params.normal_offset, 0.0);
        assert_eq!(params.angle_magnitude, 1.0);
        assert_eq!(params.min_smear_velocity, 0.0);
        assert_eq!(params.max_smear_velocity, 5.0);
        assert_eq!(params.envelope, 1.0);
    }

    #[test]
    fn test_smear_rate_clamps_frames() {
        let mut params = SmearParams::default();
        params.smear_frames = 4;
        assert_eq!(params.smear_rate(), 0.25);

        params.smear_frames = 0;
        assert_eq!(params.smear_rate(), 1.0);
        params.smear_frames = -3;
        assert_eq!(params.smear_rate(), 1.0);
    }

    #[test]
    fn test_sanitized_enforces_ranges() {
        let params = SmearParams {
            start_frame: -20,
            smear_frames: 500,
            normal_offset: -1.0,
            angle_magnitude: -2.0,
            min_smear_velocity: -0.5,
            max_smear_velocity: -5.0,
            envelope: 1.5,
        }
        .sanitized();

        assert_eq!(params.start_frame, -20);
        assert_eq!(params.smear_frames, MAX_SMEAR_FRAMES);
        assert_eq!(params.normal_offset, 0.0);
        assert_eq!(params.angle_magnitude, 0.0);
        assert_eq!(params.min_smear_velocity, 0.0);
        assert_eq!(params.max_smear_velocity, 0.0);
        assert_eq!(params.envelope, 1.0);
    }

    #[test]
    fn test_sanitized_reads_schema_ranges() {
        let params = SmearParams {
            smear_frames: i32::MAX,
            envelope: f32::MAX,
            ..Default::default()
        }
        .sanitized();

        let max_of = |name: &str| ParameterSpec::lookup(name).unwrap().max.unwrap();
        assert_eq!(f64::from(params.smear_frames), max_of("smearFrames"));
        assert_eq!(f64::from(params.envelope), max_of("envelope"));
        assert_eq!(clamp_to("unknown", -3.0), -3.0);
    }

    #[test]
    fn test_from_json_partial() {
        let params = SmearParams::from_json(r#"{ "smearFrames": 4, "envelope": 0.5 }"#).unwrap();
        assert_eq!(params.smear_frames, 4);
        assert_eq!(params.envelope, 0.5);
        assert_eq!(params.max_smear_velocity, DEFAULT_MAX_SMEAR_VELOCITY);
    }

    #[test]
    fn test_from_json_rejects_garbage() {
        assert!(matches!(
            SmearParams::from_json("{ smearFrames: "),
            Err(ConfigError::Json(_))
        ));
    }

    #[test]
    fn test_dispatch_config() {
        let config = DispatchConfig::default();
        assert_eq!(config.task_count, DEFAULT_TASK_COUNT);
        assert_eq!(DispatchConfig::with_task_count(0).effective_task_count(), 1);

        let config = DispatchConfig::from_json(r#"{ "workerThreads": 2 }"#).unwrap();
        assert_eq!(config.task_count, DEFAULT_TASK_COUNT);
        assert_eq!(config.worker_threads, Some(2));
    }
}

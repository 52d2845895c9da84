//! Read-only parameter schema.
//!
//! Every deformer instance is described by the same table. It lives in a
//! `static` and is never mutated; instances only carry their own values.

use crate::{DEFAULT_MAX_SMEAR_VELOCITY, DEFAULT_SMEAR_FRAMES, DEFAULT_START_FRAME, MAX_SMEAR_FRAMES};

/// Value type of a parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParameterKind {
    Time,
    Matrix,
    Int,
    Float,
    Double,
    /// Per-vertex paintable float map
    FloatMap,
}

/// Description of one deformer parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ParameterSpec {
    pub name: &'static str,
    pub kind: ParameterKind,
    /// Default as f64 (matrices default to identity and report 0)
    pub default: f64,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub keyable: bool,
    /// Whether a change to this parameter dirties the deformed output
    pub affects_output: bool,
}

impl ParameterSpec {
    const fn new(name: &'static str, kind: ParameterKind, default: f64) -> Self {
        Self {
            name,
            kind,
            default,
            min: None,
            max: None,
            keyable: true,
            affects_output: true,
        }
    }

    const fn range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        self.min = min;
        self.max = max;
        self
    }

    const fn connection_only(mut self) -> Self {
        self.keyable = false;
        self
    }

    const fn passive(mut self) -> Self {
        self.affects_output = false;
        self
    }

    /// Find a parameter by name.
    pub fn lookup(name: &str) -> Option<&'static ParameterSpec> {
        PARAMETERS.iter().find(|spec| spec.name == name)
    }

    /// Clamp a value into this parameter's range.
    pub fn clamp(&self, value: f64) -> f64 {
        let value = self.min.map_or(value, |min| value.max(min));
        self.max.map_or(value, |max| value.min(max))
    }
}

static PARAMETERS: [ParameterSpec; 10] = [
    ParameterSpec::new("time", ParameterKind::Time, 0.0).connection_only(),
    ParameterSpec::new("worldMatrix", ParameterKind::Matrix, 0.0).connection_only(),
    // startFrame only gates resets; editing it does not dirty the output.
    ParameterSpec::new("startFrame", ParameterKind::Int, DEFAULT_START_FRAME as f64).passive(),
    ParameterSpec::new("smearFrames", ParameterKind::Int, DEFAULT_SMEAR_FRAMES as f64)
        .range(Some(1.0), Some(MAX_SMEAR_FRAMES as f64)),
    ParameterSpec::new("normalOffset", ParameterKind::Float, 0.0).range(Some(0.0), None),
    ParameterSpec::new("angleMagnitude", ParameterKind::Float, 1.0).range(Some(0.0), None),
    ParameterSpec::new("minSmearVelocity", ParameterKind::Double, 0.0).range(Some(0.0), None),
    ParameterSpec::new("maxSmearVelocity", ParameterKind::Double, DEFAULT_MAX_SMEAR_VELOCITY)
        .range(Some(0.0), None),
    ParameterSpec::new("envelope", ParameterKind::Float, 1.0).range(Some(0.0), Some(1.0)),
    ParameterSpec::new("weights", ParameterKind::FloatMap, 1.0).range(Some(0.0), Some(1.0)),
];

/// The process-wide parameter schema.
pub fn parameter_schema() -> &'static [ParameterSpec] {
    &PARAMETERS
}

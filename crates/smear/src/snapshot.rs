//! Immutable per-frame input bundle.

use glam::{DMat4, DVec3};
use meshblur_config::SmearParams;

use crate::error::SmearError;

/// Everything one evaluation reads: goal positions, transforms, painted
/// weights, normals and the scalar parameter table.
///
/// All per-vertex sequences are validated to share one length on
/// construction, so the evaluator can index them without checks.
#[derive(Debug, Clone)]
pub struct FrameInputSnapshot {
    time: f64,
    goal_local: Vec<DVec3>,
    local_to_world: DMat4,
    world_to_local: Option<DMat4>,
    weights: Vec<f32>,
    normals: Vec<DVec3>,
    params: SmearParams,
}

impl FrameInputSnapshot {
    /// Build a snapshot with every painted weight at 1.0.
    ///
    /// `normals` are local-space surface normals, one per goal point.
    pub fn new(
        time: f64,
        goal_local: Vec<DVec3>,
        normals: Vec<DVec3>,
        local_to_world: DMat4,
        params: SmearParams,
    ) -> Result<Self, SmearError> {
        check_len("normals", goal_local.len(), normals.len())?;

        if !local_to_world.is_finite() {
            return Err(SmearError::NonFiniteTransform);
        }
        // A zero-scaled transform has no inverse; points collapse and stay put
        let det = local_to_world.determinant();
        let world_to_local = (det != 0.0 && det.is_finite()).then(|| local_to_world.inverse());

        let weights = vec![1.0; goal_local.len()];
        Ok(Self {
            time,
            goal_local,
            local_to_world,
            world_to_local,
            weights,
            normals,
            params,
        })
    }

    /// Replace the painted weight map.
    pub fn with_weights(mut self, weights: Vec<f32>) -> Result<Self, SmearError> {
        check_len("weights", self.goal_local.len(), weights.len())?;
        self.weights = weights;
        Ok(self)
    }

    /// Current frame number.
    pub fn time(&self) -> f64 {
        self.time
    }

    pub fn vertex_count(&self) -> usize {
        self.goal_local.len()
    }

    pub fn goal_local(&self) -> &[DVec3] {
        &self.goal_local
    }

    pub fn normals(&self) -> &[DVec3] {
        &self.normals
    }

    /// Painted weights before the envelope is applied.
    pub fn painted_weights(&self) -> &[f32] {
        &self.weights
    }

    /// Effective weight of vertex `index`: painted weight times envelope.
    pub fn weight(&self, index: usize) -> f32 {
        self.weights[index] * self.params.envelope
    }

    pub fn local_to_world(&self) -> DMat4 {
        self.local_to_world
    }

    /// Inverse of `local_to_world`, or `None` when it is singular.
    pub fn world_to_local(&self) -> Option<DMat4> {
        self.world_to_local
    }

    pub fn params(&self) -> &SmearParams {
        &self.params
    }

    pub fn envelope(&self) -> f32 {
        self.params.envelope
    }

    /// Goal positions transformed into world space.
    pub fn goal_world(&self) -> Vec<DVec3> {
        self.goal_local
            .iter()
            .map(|&point| self.local_to_world.transform_point3(point))
            .collect()
    }
}

fn check_len(field: &'static str, expected: usize, actual: usize) -> Result<(), SmearError> {
    if expected != actual {
        return Err(SmearError::LengthMismatch {
            field,
            expected,
            actual,
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_defaults_weights_to_one() {
        let snapshot = FrameInputSnapshot::new(
            0.0,
            vec![DVec3::ZERO, DVec3::X],
            vec![DVec3::Z, DVec3::Z],
            DMat4::IDENTITY,
            SmearParams::default(),
        )
        .unwrap();

        assert_eq!(snapshot.vertex_count(), 2);
        assert_eq!(snapshot.painted_weights(), &[1.0, 1.0]);
    }

    #[test]
    fn test_weight_is_scaled_by_envelope() {
        let params = SmearParams {
            envelope: 0.5,
            ..Default::default()
        };
        let snapshot = FrameInputSnapshot::new(0.0, vec![DVec3::ZERO], vec![DVec3::Z], DMat4::IDENTITY, params)
            .unwrap()
            .with_weights(vec![0.5])
            .unwrap();

        assert_eq!(snapshot.weight(0), 0.25);
    }

    #[test]
    fn test_length_mismatch_is_rejected() {
        let result = FrameInputSnapshot::new(
            0.0,
            vec![DVec3::ZERO, DVec3::X],
            vec![DVec3::Z],
            DMat4::IDENTITY,
            SmearParams::default(),
        );
        assert!(matches!(
            result,
            Err(SmearError::LengthMismatch {
                field: "normals",
                expected: 2,
                actual: 1
            })
        ));

        let result = FrameInputSnapshot::new(
            0.0,
            vec![DVec3::ZERO],
            vec![DVec3::Z],
            DMat4::IDENTITY,
            SmearParams::default(),
        )
        .unwrap()
        .with_weights(vec![1.0, 1.0]);
        assert!(matches!(result, Err(SmearError::LengthMismatch { field: "weights", .. })));
    }

    #[test]
    fn test_singular_transform_has_no_inverse() {
        let snapshot = FrameInputSnapshot::new(
            0.0,
            vec![DVec3::X],
            vec![DVec3::Z],
            DMat4::from_scale(DVec3::new(1.0, 0.0, 1.0)),
            SmearParams::default(),
        )
        .unwrap();
        assert!(snapshot.world_to_local().is_none());
        assert_eq!(snapshot.goal_world(), vec![DVec3::X]);
    }

    #[test]
    fn test_non_finite_transform_is_rejected() {
        let mut matrix = DMat4::IDENTITY;
        matrix.w_axis.x = f64::NAN;
        let result =
            FrameInputSnapshot::new(0.0, vec![DVec3::ZERO], vec![DVec3::Z], matrix, SmearParams::default());
        assert!(matches!(result, Err(SmearError::NonFiniteTransform)));
    }

    #[test]
    fn test_goal_world_applies_transform() {
        let snapshot = FrameInputSnapshot::new(
            0.0,
            vec![DVec3::new(1.0, 0.0, 0.0)],
            vec![DVec3::Z],
            DMat4::from_translation(DVec3::new(0.0, 5.0, 0.0)),
            SmearParams::default(),
        )
        .unwrap();

        assert_eq!(snapshot.goal_world(), vec![DVec3::new(1.0, 5.0, 0.0)]);
        let back = snapshot.world_to_local().unwrap().transform_point3(DVec3::new(1.0, 5.0, 0.0));
        assert_eq!(back, DVec3::new(1.0, 0.0, 0.0));
    }
}

//! Host-facing input and output seams.

use glam::DVec3;

use crate::error::SmearError;
use crate::snapshot::FrameInputSnapshot;

/// Supplies one frame of input to a deformer.
pub trait InputProvider {
    /// Global envelope. Read before geometry is requested.
    fn envelope(&self) -> f32;

    /// Build this frame's input bundle.
    ///
    /// Fails with `InputUnavailable` when the host has no valid geometry.
    fn frame_input(&self) -> Result<FrameInputSnapshot, SmearError>;
}

/// Receives deformed local-space positions.
pub trait OutputSink {
    fn write_positions(&mut self, positions: &[DVec3]) -> Result<(), SmearError>;
}

impl OutputSink for Vec<DVec3> {
    fn write_positions(&mut self, positions: &[DVec3]) -> Result<(), SmearError> {
        self.clear();
        self.extend_from_slice(positions);
        Ok(())
    }
}

impl InputProvider for FrameInputSnapshot {
    fn envelope(&self) -> f32 {
        self.params().envelope
    }

    fn frame_input(&self) -> Result<FrameInputSnapshot, SmearError> {
        Ok(self.clone())
    }
}

/// View positions as a flat `[x0, y0, z0, x1, ...]` buffer for upload.
pub fn flatten_positions(positions: &[DVec3]) -> &[f64] {
    bytemuck::cast_slice(positions)
}

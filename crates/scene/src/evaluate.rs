//! Input provider backed by scene nodes and connections.

use std::collections::BTreeMap;

use glam::DMat4;
use smear::{FrameInputSnapshot, InputProvider, SmearError};

use crate::node::{Connection, GeometryKind, MeshBlurNode, Node, Plug, ShapeNode};

/// Attribute receiving the frame number.
pub const TIME_ATTRIBUTE: &str = "time";

/// Attribute receiving the driver's world matrix.
pub const WORLD_MATRIX_ATTRIBUTE: &str = "worldMatrix";

/// Reads one mesh blur node's inputs out of the scene.
///
/// Time and world matrix follow the node's incoming connections. An
/// unconnected time reads as frame 0; an unconnected world matrix falls back
/// to the target's own transform.
pub struct SceneInput<'a> {
    nodes: &'a BTreeMap<String, Node>,
    connections: &'a [Connection],
    name: &'a str,
    node: &'a MeshBlurNode,
}

impl<'a> SceneInput<'a> {
    pub(crate) fn new(
        nodes: &'a BTreeMap<String, Node>,
        connections: &'a [Connection],
        name: &'a str,
        node: &'a MeshBlurNode,
    ) -> Self {
        Self {
            nodes,
            connections,
            name,
            node,
        }
    }

    fn upstream(&self, attribute: &str) -> Option<&'a Node> {
        let destination = Plug::new(self.name, attribute);
        self.connections
            .iter()
            .find(|c| c.destination == destination)
            .and_then(|c| self.nodes.get(&c.source.node))
    }

    pub fn time(&self) -> f64 {
        match self.upstream(TIME_ATTRIBUTE) {
            Some(Node::TimeSource(time)) => time.current_time,
            _ => 0.0,
        }
    }

    pub fn world_matrix(&self) -> DMat4 {
        if let Some(Node::Transform(transform)) = self.upstream(WORLD_MATRIX_ATTRIBUTE) {
            return transform.world_matrix;
        }
        match self.nodes.get(&self.node.target) {
            Some(Node::Shape(shape)) => match self.nodes.get(&shape.parent) {
                Some(Node::Transform(transform)) => transform.world_matrix,
                _ => DMat4::IDENTITY,
            },
            _ => DMat4::IDENTITY,
        }
    }
}

impl InputProvider for SceneInput<'_> {
    fn envelope(&self) -> f32 {
        self.node.params().envelope
    }

    fn frame_input(&self) -> Result<FrameInputSnapshot, SmearError> {
        let mesh = match self.nodes.get(&self.node.target) {
            Some(Node::Shape(ShapeNode {
                geometry: GeometryKind::Mesh,
                mesh: Some(mesh),
                ..
            })) => mesh,
            _ => {
                return Err(SmearError::InputUnavailable(format!(
                    "'{}' has no mesh input",
                    self.node.target
                )))
            }
        };

        FrameInputSnapshot::new(
            self.time(),
            mesh.positions.clone(),
            mesh.normals.clone(),
            self.world_matrix(),
            *self.node.params(),
        )?
        .with_weights(self.node.weight_map(mesh.vertex_count()))
    }
}

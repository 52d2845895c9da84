//! Scene node types.

use std::fmt;

use glam::{DMat4, DVec3};
use meshblur_config::{clamp_to, SmearParams};

/// Name of the scene's default time source.
pub const DEFAULT_TIME_NODE: &str = "time1";

/// Kind of geometry a shape node carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryKind {
    Mesh,
    NurbsCurve,
    NurbsSurface,
}

/// Vertex data of a mesh shape.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MeshData {
    /// Animated input positions, local space
    pub positions: Vec<DVec3>,
    /// Per-vertex normals, local space
    pub normals: Vec<DVec3>,
    /// Positions written by the last deformation, if any
    pub deformed: Option<Vec<DVec3>>,
}

impl MeshData {
    pub fn new(positions: Vec<DVec3>, normals: Vec<DVec3>) -> Self {
        Self {
            positions,
            normals,
            deformed: None,
        }
    }

    pub fn vertex_count(&self) -> usize {
        self.positions.len()
    }

    /// Deformed positions if present, otherwise the input positions.
    pub fn output_positions(&self) -> &[DVec3] {
        self.deformed.as_deref().unwrap_or(&self.positions)
    }

    /// Output positions as a flat f64 buffer.
    pub fn output_buffer(&self) -> &[f64] {
        smear::flatten_positions(self.output_positions())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TransformNode {
    pub world_matrix: DMat4,
    pub children: Vec<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ShapeNode {
    pub parent: String,
    pub geometry: GeometryKind,
    /// Intermediate shapes hold upstream geometry and are never targeted
    pub intermediate: bool,
    pub mesh: Option<MeshData>,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeNode {
    pub current_time: f64,
}

/// Attribute values of a mesh blur deformer node.
#[derive(Debug, Clone, PartialEq)]
pub struct MeshBlurNode {
    /// Shape whose geometry is deformed
    pub target: String,
    params: SmearParams,
    /// Painted weights; vertices past the end paint as 1.0
    weights: Vec<f32>,
}

impl MeshBlurNode {
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            params: SmearParams::default(),
            weights: Vec::new(),
        }
    }

    pub fn params(&self) -> &SmearParams {
        &self.params
    }

    /// Replace the parameter table, clamped into the schema ranges.
    pub fn set_params(&mut self, params: SmearParams) {
        self.params = params.sanitized();
    }

    /// Paint one vertex weight (clamped to [0, 1]).
    pub fn set_weight(&mut self, index: usize, weight: f32) {
        if self.weights.len() <= index {
            self.weights.resize(index + 1, 1.0);
        }
        self.weights[index] = clamp_to("weights", f64::from(weight)) as f32;
    }

    pub fn weight(&self, index: usize) -> f32 {
        self.weights.get(index).copied().unwrap_or(1.0)
    }

    /// Painted weights for a mesh of `vertex_count` vertices.
    pub fn weight_map(&self, vertex_count: usize) -> Vec<f32> {
        (0..vertex_count).map(|i| self.weight(i)).collect()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Node {
    Transform(TransformNode),
    Shape(ShapeNode),
    TimeSource(TimeNode),
    MeshBlur(MeshBlurNode),
}

impl Node {
    pub fn type_name(&self) -> &'static str {
        match self {
            Node::Transform(_) => "transform",
            Node::Shape(_) => "shape",
            Node::TimeSource(_) => "time",
            Node::MeshBlur(_) => "meshBlur",
        }
    }
}

/// One attribute of one node, optionally an array element.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Plug {
    pub node: String,
    pub attribute: String,
    pub index: Option<u32>,
}

impl Plug {
    pub fn new(node: impl Into<String>, attribute: impl Into<String>) -> Self {
        Self {
            node: node.into(),
            attribute: attribute.into(),
            index: None,
        }
    }

    pub fn element(mut self, index: u32) -> Self {
        self.index = Some(index);
        self
    }
}

impl fmt::Display for Plug {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.index {
            Some(index) => write!(f, "{}.{}[{}]", self.node, self.attribute, index),
            None => write!(f, "{}.{}", self.node, self.attribute),
        }
    }
}

/// A directed attribute connection.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Connection {
    pub source: Plug,
    pub destination: Plug,
}

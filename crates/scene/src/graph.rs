//! In-memory scene: named nodes, parenting, and attribute connections.

use std::collections::{BTreeMap, HashMap};

use glam::{DMat4, DVec3};
use smear::{DeformerNode, DispatchConfig, EvaluationOutcome, SmearError};
use tracing::debug;

use crate::error::SceneError;
use crate::evaluate::SceneInput;
use crate::node::{
    Connection, GeometryKind, MeshBlurNode, MeshData, Node, Plug, ShapeNode, TimeNode,
    TransformNode, DEFAULT_TIME_NODE,
};

/// A resolved deformation target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShapePath {
    pub transform: String,
    pub shape: String,
}

/// Host scene holding nodes, connections, and live deformers.
#[derive(Debug)]
pub struct Scene {
    nodes: BTreeMap<String, Node>,
    connections: Vec<Connection>,
    deformers: HashMap<String, DeformerNode>,
    dispatch: DispatchConfig,
}

impl Default for Scene {
    fn default() -> Self {
        Self::new()
    }
}

impl Scene {
    /// Create a scene containing only the default time source.
    pub fn new() -> Self {
        Self::with_dispatch(DispatchConfig::default())
    }

    /// Create a scene whose deformers use the given dispatch settings.
    pub fn with_dispatch(dispatch: DispatchConfig) -> Self {
        let mut nodes = BTreeMap::new();
        nodes.insert(
            DEFAULT_TIME_NODE.to_string(),
            Node::TimeSource(TimeNode { current_time: 0.0 }),
        );
        Self {
            nodes,
            connections: Vec::new(),
            deformers: HashMap::new(),
            dispatch,
        }
    }

    pub fn node(&self, name: &str) -> Option<&Node> {
        self.nodes.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.nodes.contains_key(name)
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    fn insert_node(&mut self, name: &str, node: Node) -> Result<(), SceneError> {
        if self.nodes.contains_key(name) {
            return Err(SceneError::NameTaken(name.to_string()));
        }
        self.nodes.insert(name.to_string(), node);
        Ok(())
    }

    pub fn add_transform(&mut self, name: &str, world_matrix: DMat4) -> Result<(), SceneError> {
        self.insert_node(
            name,
            Node::Transform(TransformNode {
                world_matrix,
                children: Vec::new(),
            }),
        )
    }

    /// Add a shape under an existing transform.
    pub fn add_shape(
        &mut self,
        transform: &str,
        name: &str,
        geometry: GeometryKind,
        intermediate: bool,
        mesh: Option<MeshData>,
    ) -> Result<(), SceneError> {
        self.transform_mut(transform)?;
        self.insert_node(
            name,
            Node::Shape(ShapeNode {
                parent: transform.to_string(),
                geometry,
                intermediate,
                mesh,
            }),
        )?;
        self.transform_mut(transform)?.children.push(name.to_string());
        Ok(())
    }

    /// Add a visible mesh shape under an existing transform.
    pub fn add_mesh(&mut self, transform: &str, name: &str, mesh: MeshData) -> Result<(), SceneError> {
        self.add_shape(transform, name, GeometryKind::Mesh, false, Some(mesh))
    }

    fn transform_mut(&mut self, name: &str) -> Result<&mut TransformNode, SceneError> {
        match self.nodes.get_mut(name) {
            Some(Node::Transform(transform)) => Ok(transform),
            Some(_) => Err(SceneError::WrongNodeType {
                name: name.to_string(),
                expected: "transform",
            }),
            None => Err(SceneError::NodeNotFound(name.to_string())),
        }
    }

    pub fn set_world_matrix(&mut self, transform: &str, world_matrix: DMat4) -> Result<(), SceneError> {
        self.transform_mut(transform)?.world_matrix = world_matrix;
        Ok(())
    }

    /// Set the frame of the default time source.
    pub fn set_time(&mut self, time: f64) {
        if let Some(Node::TimeSource(node)) = self.nodes.get_mut(DEFAULT_TIME_NODE) {
            node.current_time = time;
        }
    }

    pub fn mesh(&self, shape: &str) -> Option<&MeshData> {
        match self.nodes.get(shape) {
            Some(Node::Shape(ShapeNode { mesh, .. })) => mesh.as_ref(),
            _ => None,
        }
    }

    fn mesh_mut(&mut self, shape: &str) -> Option<&mut MeshData> {
        match self.nodes.get_mut(shape) {
            Some(Node::Shape(ShapeNode { mesh, .. })) => mesh.as_mut(),
            _ => None,
        }
    }

    /// Replace the animated input positions of a mesh shape.
    pub fn set_mesh_positions(&mut self, shape: &str, positions: Vec<DVec3>) -> Result<(), SceneError> {
        let mesh = self
            .mesh_mut(shape)
            .ok_or_else(|| SceneError::NodeNotFound(shape.to_string()))?;
        mesh.positions = positions;
        Ok(())
    }

    pub fn mesh_blur(&self, name: &str) -> Option<&MeshBlurNode> {
        match self.nodes.get(name) {
            Some(Node::MeshBlur(node)) => Some(node),
            _ => None,
        }
    }

    pub fn mesh_blur_mut(&mut self, name: &str) -> Option<&mut MeshBlurNode> {
        match self.nodes.get_mut(name) {
            Some(Node::MeshBlur(node)) => Some(node),
            _ => None,
        }
    }

    /// The live deformer behind a mesh blur node.
    pub fn deformer(&self, name: &str) -> Option<&DeformerNode> {
        self.deformers.get(name)
    }

    /// Connect two plugs. A destination accepts one incoming connection.
    pub fn connect(&mut self, source: Plug, destination: Plug) -> Result<(), SceneError> {
        for plug in [&source, &destination] {
            if !self.nodes.contains_key(&plug.node) {
                return Err(SceneError::NodeNotFound(plug.node.clone()));
            }
        }
        if self.incoming(&destination).is_some() {
            return Err(SceneError::AlreadyConnected(destination.to_string()));
        }
        self.connections.push(Connection {
            source,
            destination,
        });
        Ok(())
    }

    /// Remove a connection; returns whether it existed.
    pub fn disconnect(&mut self, connection: &Connection) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c != connection);
        self.connections.len() != before
    }

    /// Source plug feeding `destination`, if connected.
    pub fn incoming(&self, destination: &Plug) -> Option<&Plug> {
        self.connections
            .iter()
            .find(|c| &c.destination == destination)
            .map(|c| &c.source)
    }

    /// Remove a node with its connections and any deformer it owns.
    ///
    /// Removing a mesh blur node restores its target's undeformed output.
    pub fn remove_node(&mut self, name: &str) -> Option<Node> {
        let node = self.nodes.remove(name)?;
        self.connections
            .retain(|c| c.source.node != name && c.destination.node != name);
        self.deformers.remove(name);
        match &node {
            Node::Shape(shape) => {
                if let Some(Node::Transform(parent)) = self.nodes.get_mut(&shape.parent) {
                    parent.children.retain(|child| child != name);
                }
            }
            Node::MeshBlur(blur) => {
                if let Some(mesh) = self.mesh_mut(&blur.target) {
                    mesh.deformed = None;
                }
            }
            _ => {}
        }
        Some(node)
    }

    /// Resolve a selected object to the shape a deformer should target.
    ///
    /// A selected shape climbs to its transform; the transform's first
    /// non-intermediate shape is chosen and must be a mesh.
    pub fn resolve_mesh_target(&self, name: &str) -> Result<ShapePath, SmearError> {
        let invalid = |reason: &str| SmearError::InvalidTarget {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        let transform = match self.nodes.get(name) {
            Some(Node::Shape(shape)) => shape.parent.as_str(),
            Some(Node::Transform(_)) => name,
            Some(_) => return Err(invalid("not a geometry object")),
            None => return Err(invalid("no such object")),
        };
        let Some(Node::Transform(transform_node)) = self.nodes.get(transform) else {
            return Err(invalid("shape has no transform"));
        };

        let shape = transform_node.children.iter().find_map(|child| match self.nodes.get(child) {
            Some(Node::Shape(shape)) if !shape.intermediate => Some((child, shape)),
            _ => None,
        });
        let Some((shape_name, shape)) = shape else {
            return Err(invalid("no visible shape found"));
        };
        if shape.geometry != GeometryKind::Mesh {
            return Err(invalid("mesh blur only works on meshes"));
        }

        Ok(ShapePath {
            transform: transform.to_string(),
            shape: shape_name.clone(),
        })
    }

    /// Expand `#` in `pattern` to the smallest free positive integer.
    pub fn unique_name(&self, pattern: &str) -> Result<String, SceneError> {
        if !pattern.contains('#') {
            if self.contains(pattern) {
                return Err(SceneError::NameTaken(pattern.to_string()));
            }
            return Ok(pattern.to_string());
        }
        let name = (1..)
            .map(|n: u64| pattern.replacen('#', &n.to_string(), 1))
            .find(|candidate| !self.contains(candidate))
            .ok_or_else(|| SceneError::NameTaken(pattern.to_string()))?;
        Ok(name)
    }

    /// Create a mesh blur node and its deformer for `target`.
    ///
    /// The deformer is built first so a pool failure leaves the scene
    /// unchanged.
    pub(crate) fn insert_mesh_blur(&mut self, name: &str, target: &ShapePath) -> Result<(), SceneError> {
        if self.contains(name) {
            return Err(SceneError::NameTaken(name.to_string()));
        }
        let deformer = DeformerNode::with_config(&self.dispatch)?;
        self.insert_node(name, Node::MeshBlur(MeshBlurNode::new(target.shape.clone())))?;
        self.deformers.insert(name.to_string(), deformer);
        Ok(())
    }

    /// Evaluate a mesh blur node at the current time and store the result
    /// on its target mesh.
    pub fn evaluate(&mut self, name: &str) -> Result<EvaluationOutcome, SceneError> {
        let Some(Node::MeshBlur(node)) = self.nodes.get(name) else {
            return Err(SceneError::NodeNotFound(name.to_string()));
        };
        let target = node.target.clone();

        let input = SceneInput::new(&self.nodes, &self.connections, name, node);
        let deformer = self
            .deformers
            .get_mut(name)
            .ok_or_else(|| SceneError::NodeNotFound(name.to_string()))?;

        let mut positions: Vec<DVec3> = Vec::new();
        let outcome = deformer.deform(&input, &mut positions)?;
        debug!("evaluate: {} -> {:?}", name, outcome);

        // A passthrough frame shows the input geometry unchanged
        if let Some(mesh) = self.mesh_mut(&target) {
            mesh.deformed = match outcome {
                EvaluationOutcome::Deformed(_) => Some(positions),
                EvaluationOutcome::Passthrough => None,
            };
        }
        Ok(outcome)
    }
}

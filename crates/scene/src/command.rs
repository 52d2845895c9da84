//! Reversible creation of a mesh blur deformer.
//!
//! `apply` resolves the selected mesh, creates a uniquely named deformer
//! node, and wires the scene's time source and the mesh transform's world
//! matrix into it. `undo` removes the node and its connections; `redo`
//! recreates them under the same name. Each step is all-or-nothing.

use tracing::{info, warn};

use crate::error::SceneError;
use crate::evaluate::{TIME_ATTRIBUTE, WORLD_MATRIX_ATTRIBUTE};
use crate::graph::{Scene, ShapePath};
use crate::node::{Plug, DEFAULT_TIME_NODE};

/// Default node name; `#` becomes the next free integer.
pub const DEFAULT_NODE_NAME: &str = "meshBlur#";

#[derive(Debug, Clone, PartialEq, Eq)]
enum CommandState {
    Pending,
    Applied(String),
    Undone(String),
}

/// Creates a mesh blur deformer on a selected mesh.
#[derive(Debug, Clone)]
pub struct CreateMeshBlur {
    name: String,
    target: String,
    state: CommandState,
}

impl CreateMeshBlur {
    /// Create a command targeting the selected object `target`.
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            name: DEFAULT_NODE_NAME.to_string(),
            target: target.into(),
            state: CommandState::Pending,
        }
    }

    /// Request a node name (may contain `#`).
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn is_undoable(&self) -> bool {
        true
    }

    /// Name of the node this command created, while it exists.
    pub fn created(&self) -> Option<&str> {
        match &self.state {
            CommandState::Applied(name) => Some(name),
            _ => None,
        }
    }

    /// Create and wire the deformer; returns the new node's name.
    pub fn apply(&mut self, scene: &mut Scene) -> Result<String, SceneError> {
        if self.state != CommandState::Pending {
            return Err(SceneError::InvalidCommandState("apply"));
        }

        let target = scene.resolve_mesh_target(&self.target).inspect_err(|e| {
            warn!("CreateMeshBlur: {}", e);
        })?;
        let name = scene.unique_name(&self.name)?;
        attach(scene, &name, &target)?;

        info!("Created {} on {}", name, target.shape);
        self.state = CommandState::Applied(name.clone());
        Ok(name)
    }

    /// Remove the created node and its connections.
    pub fn undo(&mut self, scene: &mut Scene) -> Result<(), SceneError> {
        let CommandState::Applied(name) = &self.state else {
            return Err(SceneError::InvalidCommandState("undo"));
        };
        let name = name.clone();

        scene
            .remove_node(&name)
            .ok_or_else(|| SceneError::NodeNotFound(name.clone()))?;

        info!("Undid creation of {}", name);
        self.state = CommandState::Undone(name);
        Ok(())
    }

    /// Recreate the node under the name it had before `undo`.
    pub fn redo(&mut self, scene: &mut Scene) -> Result<String, SceneError> {
        let CommandState::Undone(name) = &self.state else {
            return Err(SceneError::InvalidCommandState("redo"));
        };
        let name = name.clone();

        // The visible shape may have changed since apply
        let target = scene.resolve_mesh_target(&self.target)?;
        attach(scene, &name, &target)?;

        info!("Redid creation of {} on {}", name, target.shape);
        self.state = CommandState::Applied(name.clone());
        Ok(name)
    }
}

/// Create the node and connect its inputs, rolling back on failure.
fn attach(scene: &mut Scene, name: &str, target: &ShapePath) -> Result<(), SceneError> {
    scene.insert_mesh_blur(name, target)?;

    let wired = scene
        .connect(
            Plug::new(DEFAULT_TIME_NODE, "outTime"),
            Plug::new(name, TIME_ATTRIBUTE),
        )
        .and_then(|()| {
            scene.connect(
                Plug::new(target.transform.as_str(), WORLD_MATRIX_ATTRIBUTE).element(0),
                Plug::new(name, WORLD_MATRIX_ATTRIBUTE),
            )
        });

    if let Err(e) = wired {
        warn!("Rolling back {}: {}", name, e);
        scene.remove_node(name);
        return Err(e);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::{GeometryKind, MeshData, Node};
    use glam::{DMat4, DVec3};
    use smear::SmearError;

    fn scene_with_body() -> Scene {
        let mut scene = Scene::new();
        scene.add_transform("body", DMat4::IDENTITY).unwrap();
        scene
            .add_mesh(
                "body",
                "bodyShape",
                MeshData::new(vec![DVec3::ZERO, DVec3::X], vec![DVec3::Z, DVec3::Z]),
            )
            .unwrap();
        scene
    }

    #[test]
    fn test_apply_creates_and_wires() {
        let mut scene = scene_with_body();
        let mut command = CreateMeshBlur::new("body");

        let name = command.apply(&mut scene).unwrap();
        assert_eq!(name, "meshBlur1");
        assert_eq!(command.created(), Some("meshBlur1"));
        assert_eq!(scene.mesh_blur(&name).unwrap().target, "bodyShape");
        assert!(scene.deformer(&name).is_some());
        assert_eq!(
            scene.incoming(&Plug::new(name.as_str(), TIME_ATTRIBUTE)),
            Some(&Plug::new(DEFAULT_TIME_NODE, "outTime"))
        );
        assert_eq!(
            scene.incoming(&Plug::new(name.as_str(), WORLD_MATRIX_ATTRIBUTE)),
            Some(&Plug::new("body", WORLD_MATRIX_ATTRIBUTE).element(0))
        );
    }

    #[test]
    fn test_custom_name() {
        let mut scene = scene_with_body();
        let name = CreateMeshBlur::new("bodyShape")
            .with_name("bodySmear")
            .apply(&mut scene)
            .unwrap();
        assert_eq!(name, "bodySmear");
    }

    #[test]
    fn test_invalid_target_creates_nothing() {
        let mut scene = Scene::new();
        scene.add_transform("curve", DMat4::IDENTITY).unwrap();
        scene
            .add_shape("curve", "curveShape", GeometryKind::NurbsCurve, false, None)
            .unwrap();
        let before = scene.node_count();

        let mut command = CreateMeshBlur::new("curve");
        let result = command.apply(&mut scene);

        assert!(matches!(
            result,
            Err(SceneError::Smear(SmearError::InvalidTarget { .. }))
        ));
        assert_eq!(scene.node_count(), before);
        assert!(scene.connections().is_empty());
        assert!(matches!(
            command.undo(&mut scene),
            Err(SceneError::InvalidCommandState("undo"))
        ));
    }

    #[test]
    fn test_undo_restores_scene() {
        let mut scene = scene_with_body();
        let before = scene.node_count();
        let mut command = CreateMeshBlur::new("body");
        let name = command.apply(&mut scene).unwrap();

        command.undo(&mut scene).unwrap();

        assert_eq!(scene.node_count(), before);
        assert!(!scene.contains(&name));
        assert!(scene.deformer(&name).is_none());
        assert!(scene.connections().is_empty());
        assert_eq!(command.created(), None);
    }

    #[test]
    fn test_redo_reuses_name() {
        let mut scene = scene_with_body();
        let mut command = CreateMeshBlur::new("body");
        let name = command.apply(&mut scene).unwrap();
        command.undo(&mut scene).unwrap();

        let redone = command.redo(&mut scene).unwrap();
        assert_eq!(redone, name);
        assert!(matches!(scene.node(&name), Some(Node::MeshBlur(_))));
        assert_eq!(scene.connections().len(), 2);
    }

    #[test]
    fn test_state_transitions_are_enforced() {
        let mut scene = scene_with_body();
        let mut command = CreateMeshBlur::new("body");

        assert!(matches!(
            command.redo(&mut scene),
            Err(SceneError::InvalidCommandState("redo"))
        ));
        command.apply(&mut scene).unwrap();
        assert!(matches!(
            command.apply(&mut scene),
            Err(SceneError::InvalidCommandState("apply"))
        ));
        assert!(matches!(
            command.redo(&mut scene),
            Err(SceneError::InvalidCommandState("redo"))
        ));
    }

    #[test]
    fn test_redo_fails_when_name_was_taken() {
        let mut scene = scene_with_body();
        let mut command = CreateMeshBlur::new("body");
        let name = command.apply(&mut scene).unwrap();
        command.undo(&mut scene).unwrap();

        scene.add_transform(&name, DMat4::IDENTITY).unwrap();
        let connections = scene.connections().len();

        assert!(matches!(
            command.redo(&mut scene),
            Err(SceneError::NameTaken(_))
        ));
        assert_eq!(scene.connections().len(), connections);
    }

    #[test]
    fn test_two_deformers_get_distinct_names() {
        let mut scene = scene_with_body();
        let first = CreateMeshBlur::new("body").apply(&mut scene).unwrap();
        let second = CreateMeshBlur::new("body").apply(&mut scene).unwrap();
        assert_eq!(first, "meshBlur1");
        assert_eq!(second, "meshBlur2");
    }
}

//! Host scene for the mesh blur deformer
//!
//! A small named-node graph (transforms, shapes, a time source, and mesh
//! blur nodes) with attribute connections. Mesh blur nodes read their time
//! and world matrix through connections and write deformed positions back
//! onto their target mesh. Deformers are created through the reversible
//! [`CreateMeshBlur`] command.

mod command;
mod error;
mod evaluate;
mod graph;
mod node;

pub use command::{CreateMeshBlur, DEFAULT_NODE_NAME};
pub use error::SceneError;
pub use evaluate::{SceneInput, TIME_ATTRIBUTE, WORLD_MATRIX_ATTRIBUTE};
pub use graph::{Scene, ShapePath};
pub use node::{
    Connection, GeometryKind, MeshBlurNode, MeshData, Node, Plug, ShapeNode, TimeNode,
    TransformNode, DEFAULT_TIME_NODE,
};

pub use meshblur_config::{parameter_schema, DispatchConfig, ParameterSpec, SmearParams};
pub use smear::{EvaluationOutcome, EvaluationReport, ResetReason};

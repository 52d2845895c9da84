//! Scene and command errors.

use smear::SmearError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum SceneError {
    #[error(transparent)]
    Smear(#[from] SmearError),
    #[error("Node not found: {0}")]
    NodeNotFound(String),
    #[error("Name already in use: {0}")]
    NameTaken(String),
    #[error("Node '{name}' is not a {expected}")]
    WrongNodeType { name: String, expected: &'static str },
    #[error("Plug {0} already has an incoming connection")]
    AlreadyConnected(String),
    #[error("Command cannot {0} in its current state")]
    InvalidCommandState(&'static str),
}

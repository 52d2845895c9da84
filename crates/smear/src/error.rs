//! Error type shared by every fallible smear operation.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum SmearError {
    /// The host could not supply geometry for this frame.
    #[error("Input geometry unavailable: {0}")]
    InputUnavailable(String),
    /// Creation-time rejection of a target that is not a supported geometry.
    #[error("Invalid target '{name}': {reason}")]
    InvalidTarget { name: String, reason: String },
    /// A worker task failed during parallel dispatch.
    #[error("Worker task failed during dispatch: {0}")]
    ConcurrencyFault(String),
    #[error("Frame input '{field}' has {actual} entries, expected {expected}")]
    LengthMismatch {
        field: &'static str,
        expected: usize,
        actual: usize,
    },
    #[error("Local-to-world matrix has non-finite entries")]
    NonFiniteTransform,
    #[error("Worker pool unavailable: {0}")]
    PoolUnavailable(String),
}

//! Error taxonomy shared by models, the aggregator and the synchronizer

use thiserror::Error;

/// Errors that can occur while reading or mutating editor models
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Visual model is not writable: {0}")]
    NotWritable(String),

    #[error("Operation not supported by model {0}")]
    NotSupported(String),

    #[error("No active visual model selected")]
    NoActiveVisualModel,

    #[error("Unresolved reference: {0}")]
    UnresolvedReference(String),

    #[error("Operation rejected: {0}")]
    OperationRejected(String),

    #[error("Backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("Entity {id} is already defined by model {existing_model}")]
    DuplicateEntityId { id: String, existing_model: String },

    #[error("Entity {0} is already represented in the visual model")]
    AlreadyRepresented(String),

    #[error("Unknown model: {0}")]
    UnknownModel(String),

    #[error("Unknown visual model: {0}")]
    UnknownVisualModel(String),

    #[error("Unknown visual entity: {0}")]
    UnknownVisualEntity(String),

    #[error("Unknown package: {0}")]
    UnknownPackage(String),

    #[error("Serialization failed: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for ModelError {
    fn from(error: serde_json::Error) -> Self {
        ModelError::Serialization(error.to_string())
    }
}

/// Result type for model operations
pub type ModelResult<T> = Result<T, ModelError>;

/// Crate-wide error alias
pub type EditorError = ModelError;

//! Entity models
//!
//! An entity model is a single source of semantic entities. Local models are
//! editable and live in memory; external models mirror a read-only vocabulary
//! and are filled class by class.

mod external;
mod local;

pub use external::{ExternalSemanticModel, ExternalSource, InMemoryExternalSource};
pub use local::InMemorySemanticModel;

use crate::commands::{Operation, OperationResult};
use crate::error::{ModelError, ModelResult};
use crate::events::{EntityModelListener, Subscription};
use crate::semantic::Entity;
use crate::value_objects::Color;
use crate::visual::VisualEntity;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Trait implemented by every source of semantic entities
pub trait EntityModel: Send + Sync {
    /// Identifier of the model
    fn id(&self) -> &str;

    /// User facing name of the model
    fn alias(&self) -> Option<String>;

    fn set_alias(&self, alias: Option<String>);

    /// Snapshot of all entities, in insertion order
    fn entities(&self) -> IndexMap<String, Entity>;

    /// Look up a single entity
    fn entity(&self, id: &str) -> Option<Entity>;

    /// Read-only models reject every operation with `NotSupported`
    fn is_read_only(&self) -> bool;

    /// Apply a batch of operations atomically
    ///
    /// Either every operation is applied and listeners are notified once, or
    /// the first failure is returned and the model is left untouched.
    fn execute_operations(&self, operations: Vec<Operation>) -> ModelResult<Vec<OperationResult>>;

    /// Apply a single operation
    fn execute_operation(&self, operation: Operation) -> ModelResult<OperationResult> {
        self.execute_operations(vec![operation])?
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::OperationRejected("operation produced no result".to_string()))
    }

    /// Register a listener for entity changes
    fn subscribe_to_changes(&self, listener: Arc<EntityModelListener>) -> Subscription;

    /// Serializable state of the model
    fn snapshot(&self) -> ModelSnapshot;
}

/// Persisted form of a model, as exchanged with the package backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "kebab-case")]
pub enum ModelSnapshot {
    /// Editable in-memory semantic model
    Local {
        id: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        entities: Vec<Entity>,
    },
    /// External vocabulary; only the allowed classes are stored
    External {
        id: String,
        #[serde(default)]
        alias: Option<String>,
        #[serde(default)]
        allowed_classes: Vec<String>,
        #[serde(default)]
        allowed_surroundings: Vec<String>,
    },
    /// Visual (layout) model
    Visual {
        id: String,
        #[serde(default = "default_writable")]
        writable: bool,
        #[serde(default)]
        entities: Vec<VisualEntity>,
        #[serde(default)]
        colors: IndexMap<String, Color>,
    },
}

fn default_writable() -> bool {
    true
}

impl ModelSnapshot {
    pub fn id(&self) -> &str {
        match self {
            ModelSnapshot::Local { id, .. }
            | ModelSnapshot::External { id, .. }
            | ModelSnapshot::Visual { id, .. } => id,
        }
    }

    pub fn is_visual(&self) -> bool {
        matches!(self, ModelSnapshot::Visual { .. })
    }
}

//! Write-back of user actions
//!
//! Gestures on the diagram and catalog actions are turned into mutations of
//! the active visual model (and, for new connections, of an entity model).
//! Failures are reported to the user through a [`UserNotifier`] and returned
//! to the caller; the diagram is left unchanged.

mod catalog;
mod gestures;

pub use gestures::DiagramGesture;

use crate::aggregator::AggregatedEntity;
use crate::commands::Operation;
use crate::error::{ModelError, ModelResult};
use crate::sync::DiagramSynchronizer;
use crate::visual::VisualModel;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Shows errors to the user
pub trait UserNotifier: Send + Sync {
    fn notify_error(&self, error: &ModelError);
}

/// Notifier writing to the log, used when no UI is attached
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingNotifier;

impl UserNotifier for TracingNotifier {
    fn notify_error(&self, error: &ModelError) {
        tracing::warn!(%error, "User action failed");
    }
}

/// What the connection dialog is opened with
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionContext {
    /// Node the connection starts at
    pub source: String,
    /// Node the connection ends at
    pub target: String,
    pub source_entity: Option<AggregatedEntity>,
    pub target_entity: Option<AggregatedEntity>,
    /// Entity models able to store the new entity
    pub writable_models: Vec<String>,
}

/// Entity the user confirmed in the connection dialog
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionRequest {
    /// Entity model the operation is executed on
    pub model_id: String,
    pub operation: Operation,
}

/// Dialog asking which entity a drawn connection creates
pub trait ConnectionDialog: Send + Sync {
    /// `None` when the user cancelled
    fn open(&self, context: &ConnectionContext) -> Option<ConnectionRequest>;
}

impl<F> ConnectionDialog for F
where
    F: Fn(&ConnectionContext) -> Option<ConnectionRequest> + Send + Sync,
{
    fn open(&self, context: &ConnectionContext) -> Option<ConnectionRequest> {
        self(context)
    }
}

impl DiagramSynchronizer {
    /// Active visual model, provided it accepts mutations
    pub(crate) fn writable_active_model(&self) -> ModelResult<Arc<dyn VisualModel>> {
        let model = self
            .active_visual_model()
            .cloned()
            .ok_or(ModelError::NoActiveVisualModel)?;
        if !model.is_writable() {
            return Err(ModelError::NotWritable(model.id().to_string()));
        }
        Ok(model)
    }

    /// Pass a failure on to the user before returning it
    pub(crate) fn report<T>(&self, result: ModelResult<T>) -> ModelResult<T> {
        if let Err(error) = &result {
            self.notifier.notify_error(error);
        }
        result
    }
}

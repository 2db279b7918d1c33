//! Change notifications
//!
//! Entity models, the aggregator and visual models report changes through
//! listeners registered with `subscribe_*` calls. Notifications are delivered
//! synchronously, in mutation order, after the source has released its locks.

mod listeners;

pub use listeners::{ListenerRegistry, Subscription};

use crate::aggregator::AggregatedEntity;
use crate::semantic::Entity;
use crate::value_objects::Color;
use crate::visual::VisualEntity;
use serde::{Deserialize, Serialize};

/// One batch of changes of a single entity model
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EntityModelChanges {
    /// Created or modified entities, in their new state
    pub updated: Vec<Entity>,
    /// Ids of deleted entities
    pub removed: Vec<String>,
}

impl EntityModelChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// One batch of changes of the aggregated view
///
/// An id never appears in both lists of the same batch.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AggregatedChanges {
    pub updated: Vec<AggregatedEntity>,
    pub removed: Vec<String>,
}

impl AggregatedChanges {
    pub fn is_empty(&self) -> bool {
        self.updated.is_empty() && self.removed.is_empty()
    }
}

/// A created (`previous` empty), updated, or deleted (`next` empty) visual entity
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualEntityChange {
    pub previous: Option<VisualEntity>,
    pub next: Option<VisualEntity>,
}

impl VisualEntityChange {
    pub fn created(entity: VisualEntity) -> Self {
        Self {
            previous: None,
            next: Some(entity),
        }
    }

    pub fn updated(previous: VisualEntity, next: VisualEntity) -> Self {
        Self {
            previous: Some(previous),
            next: Some(next),
        }
    }

    pub fn deleted(entity: VisualEntity) -> Self {
        Self {
            previous: Some(entity),
            next: None,
        }
    }

    /// Identifier of the changed visual entity
    pub fn identifier(&self) -> Option<&str> {
        self.next
            .as_ref()
            .or(self.previous.as_ref())
            .map(VisualEntity::identifier)
    }
}

/// Listener of an entity model
pub type EntityModelListener = dyn Fn(&EntityModelChanges) + Send + Sync;

/// Listener of the aggregated view
pub type AggregatorListener = dyn Fn(&AggregatedChanges) + Send + Sync;

/// Listener of active visual model switches, receives the new model id
pub type ActiveVisualModelListener = dyn Fn(Option<&str>) + Send + Sync;

/// A visual model was registered with or removed from the aggregator
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisualModelRegistration {
    Added(String),
    Removed(String),
}

/// Listener of visual model registrations
pub type VisualModelRegistryListener = dyn Fn(&VisualModelRegistration) + Send + Sync;

/// Listener of a visual model
pub trait VisualModelListener: Send + Sync {
    /// Visual entities were created, updated or deleted
    fn visual_entities_did_change(&self, changes: &[VisualEntityChange]);

    /// The color of an entity model changed; `None` means reset to default
    fn model_color_did_change(&self, model_id: &str, color: Option<Color>);
}

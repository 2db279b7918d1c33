//! Visual models
//!
//! A visual model stores only presentation data: where a semantic entity is
//! drawn, which attributes its node shows, how its edge is routed and which
//! color each entity model uses. Visual entities point back at the semantic
//! entity they represent.

mod in_memory;
mod read_only;

pub use in_memory::InMemoryVisualModel;
pub use read_only::ReadOnlyVisualModel;

use crate::error::ModelResult;
use crate::events::{Subscription, VisualModelListener};
use crate::model::ModelSnapshot;
use crate::value_objects::{Color, Position, Waypoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Node drawn for a class or class profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNode {
    pub identifier: String,
    /// Entity model owning the represented entity
    pub model: String,
    pub represented_entity: String,
    pub position: Position,
    /// Attribute ids shown in the node, in display order
    #[serde(default)]
    pub content: Vec<String>,
    /// Nested visual models reachable from this node
    #[serde(default)]
    pub visual_models: Vec<String>,
}

/// Edge drawn for a relationship, generalization or profile link
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualRelationship {
    pub identifier: String,
    pub model: String,
    pub represented_relationship: String,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

/// Entity stored by a visual model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum VisualEntity {
    VisualNode(VisualNode),
    VisualRelationship(VisualRelationship),
}

impl VisualEntity {
    pub fn identifier(&self) -> &str {
        match self {
            VisualEntity::VisualNode(node) => &node.identifier,
            VisualEntity::VisualRelationship(relationship) => &relationship.identifier,
        }
    }

    /// Entity model owning the represented entity
    pub fn model(&self) -> &str {
        match self {
            VisualEntity::VisualNode(node) => &node.model,
            VisualEntity::VisualRelationship(relationship) => &relationship.model,
        }
    }

    /// Id of the semantic entity this visual entity represents
    pub fn represented(&self) -> &str {
        match self {
            VisualEntity::VisualNode(node) => &node.represented_entity,
            VisualEntity::VisualRelationship(relationship) => {
                &relationship.represented_relationship
            }
        }
    }
}

/// Parameters of [`VisualModel::add_visual_node`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualNodeSpec {
    pub model: String,
    pub represented_entity: String,
    pub position: Position,
    #[serde(default)]
    pub content: Vec<String>,
    #[serde(default)]
    pub visual_models: Vec<String>,
}

impl VisualNodeSpec {
    pub fn new(model: impl Into<String>, represented_entity: impl Into<String>, position: Position) -> Self {
        Self {
            model: model.into(),
            represented_entity: represented_entity.into(),
            position,
            content: Vec::new(),
            visual_models: Vec::new(),
        }
    }
}

/// Parameters of [`VisualModel::add_visual_relationship`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VisualRelationshipSpec {
    pub model: String,
    pub represented_relationship: String,
    #[serde(default)]
    pub waypoints: Vec<Waypoint>,
}

impl VisualRelationshipSpec {
    pub fn new(model: impl Into<String>, represented_relationship: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            represented_relationship: represented_relationship.into(),
            waypoints: Vec::new(),
        }
    }
}

/// Partial update of a visual entity; `None` fields are left untouched
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct VisualEntityUpdate {
    #[serde(default)]
    pub position: Option<Position>,
    #[serde(default)]
    pub content: Option<Vec<String>>,
    #[serde(default)]
    pub visual_models: Option<Vec<String>>,
    #[serde(default)]
    pub waypoints: Option<Vec<Waypoint>>,
}

impl VisualEntityUpdate {
    pub fn position(position: Position) -> Self {
        Self {
            position: Some(position),
            ..Self::default()
        }
    }
}

/// Trait implemented by every store of visual entities
pub trait VisualModel: Send + Sync {
    fn id(&self) -> &str;

    /// Non-writable models reject every mutation with `NotWritable`
    fn is_writable(&self) -> bool;

    fn visual_entities(&self) -> IndexMap<String, VisualEntity>;

    fn visual_entity(&self, identifier: &str) -> Option<VisualEntity>;

    /// Node representing a semantic entity, via a secondary index
    fn visual_node_for_represented(&self, represented: &str) -> Option<VisualNode>;

    /// Edge representing a semantic entity, via a secondary index
    fn visual_relationship_for_represented(&self, represented: &str) -> Option<VisualRelationship>;

    /// Visual entity representing a semantic entity; nodes take precedence
    /// over profile edges of the same class profile
    fn visual_entity_for_represented(&self, represented: &str) -> Option<VisualEntity> {
        self.visual_node_for_represented(represented)
            .map(VisualEntity::VisualNode)
            .or_else(|| {
                self.visual_relationship_for_represented(represented)
                    .map(VisualEntity::VisualRelationship)
            })
    }

    /// Add a node, returning its generated identifier
    fn add_visual_node(&self, spec: VisualNodeSpec) -> ModelResult<String>;

    /// Add an edge, returning its generated identifier
    fn add_visual_relationship(&self, spec: VisualRelationshipSpec) -> ModelResult<String>;

    fn update_visual_entity(&self, identifier: &str, update: VisualEntityUpdate) -> ModelResult<()>;

    fn delete_visual_entity(&self, identifier: &str) -> ModelResult<()>;

    /// Color assigned to an entity model
    fn model_color(&self, model_id: &str) -> Option<Color>;

    /// Assign (or with `None` reset) the color of an entity model
    fn set_model_color(&self, model_id: &str, color: Option<Color>) -> ModelResult<()>;

    fn model_colors(&self) -> IndexMap<String, Color>;

    fn subscribe_to_changes(&self, listener: Arc<dyn VisualModelListener>) -> Subscription;

    fn snapshot(&self) -> ModelSnapshot;
}

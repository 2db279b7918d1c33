//! Writable in-memory visual model

use super::{
    VisualEntity, VisualEntityUpdate, VisualModel, VisualNode, VisualNodeSpec, VisualRelationship,
    VisualRelationshipSpec,
};
use crate::error::{ModelError, ModelResult};
use crate::events::{ListenerRegistry, Subscription, VisualEntityChange, VisualModelListener};
use crate::model::ModelSnapshot;
use crate::value_objects::Color;
use indexmap::IndexMap;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Visual entities plus the represented-entity index kept in lockstep
#[derive(Debug, Clone, Default)]
pub(crate) struct VisualStore {
    entities: IndexMap<String, VisualEntity>,
    nodes_by_represented: HashMap<String, String>,
    relationships_by_represented: HashMap<String, String>,
    colors: IndexMap<String, Color>,
}

impl VisualStore {
    pub(crate) fn from_parts(
        entities: impl IntoIterator<Item = VisualEntity>,
        colors: IndexMap<String, Color>,
    ) -> ModelResult<Self> {
        let mut store = Self {
            colors,
            ..Self::default()
        };
        for entity in entities {
            store.insert(entity)?;
        }
        Ok(store)
    }

    pub(crate) fn entities(&self) -> &IndexMap<String, VisualEntity> {
        &self.entities
    }

    pub(crate) fn colors(&self) -> &IndexMap<String, Color> {
        &self.colors
    }

    pub(crate) fn get(&self, identifier: &str) -> Option<&VisualEntity> {
        self.entities.get(identifier)
    }

    pub(crate) fn node_for_represented(&self, represented: &str) -> Option<&VisualNode> {
        match self
            .nodes_by_represented
            .get(represented)
            .and_then(|identifier| self.entities.get(identifier))
        {
            Some(VisualEntity::VisualNode(node)) => Some(node),
            _ => None,
        }
    }

    pub(crate) fn relationship_for_represented(
        &self,
        represented: &str,
    ) -> Option<&VisualRelationship> {
        match self
            .relationships_by_represented
            .get(represented)
            .and_then(|identifier| self.entities.get(identifier))
        {
            Some(VisualEntity::VisualRelationship(relationship)) => Some(relationship),
            _ => None,
        }
    }

    fn index_of(&mut self, entity: &VisualEntity) -> &mut HashMap<String, String> {
        match entity {
            VisualEntity::VisualNode(_) => &mut self.nodes_by_represented,
            VisualEntity::VisualRelationship(_) => &mut self.relationships_by_represented,
        }
    }

    fn insert(&mut self, entity: VisualEntity) -> ModelResult<()> {
        let represented = entity.represented().to_string();
        let identifier = entity.identifier().to_string();
        if self.entities.contains_key(&identifier) {
            return Err(ModelError::OperationRejected(format!(
                "Visual entity {identifier} already exists"
            )));
        }
        let index = self.index_of(&entity);
        if index.contains_key(&represented) {
            return Err(ModelError::AlreadyRepresented(represented));
        }
        index.insert(represented, identifier.clone());
        self.entities.insert(identifier, entity);
        Ok(())
    }

    fn remove(&mut self, identifier: &str) -> ModelResult<VisualEntity> {
        let entity = self
            .entities
            .shift_remove(identifier)
            .ok_or_else(|| ModelError::UnknownVisualEntity(identifier.to_string()))?;
        let represented = entity.represented().to_string();
        self.index_of(&entity).remove(&represented);
        Ok(entity)
    }

    /// Apply an update, returning the previous and the new state if anything changed
    fn update(
        &mut self,
        identifier: &str,
        update: VisualEntityUpdate,
    ) -> ModelResult<Option<(VisualEntity, VisualEntity)>> {
        let entity = self
            .entities
            .get_mut(identifier)
            .ok_or_else(|| ModelError::UnknownVisualEntity(identifier.to_string()))?;
        let previous = entity.clone();

        match entity {
            VisualEntity::VisualNode(node) => {
                if update.waypoints.is_some() {
                    return Err(ModelError::OperationRejected(format!(
                        "Visual node {identifier} has no waypoints"
                    )));
                }
                if let Some(position) = update.position {
                    node.position = position;
                }
                if let Some(content) = update.content {
                    node.content = content;
                }
                if let Some(visual_models) = update.visual_models {
                    node.visual_models = visual_models;
                }
            }
            VisualEntity::VisualRelationship(relationship) => {
                if update.position.is_some()
                    || update.content.is_some()
                    || update.visual_models.is_some()
                {
                    return Err(ModelError::OperationRejected(format!(
                        "Visual relationship {identifier} only accepts waypoints"
                    )));
                }
                if let Some(waypoints) = update.waypoints {
                    relationship.waypoints = waypoints;
                }
            }
        }

        if *entity == previous {
            return Ok(None);
        }
        Ok(Some((previous, entity.clone())))
    }
}

/// Writable visual model held in memory
pub struct InMemoryVisualModel {
    id: String,
    store: RwLock<VisualStore>,
    listeners: ListenerRegistry<dyn VisualModelListener>,
}

impl InMemoryVisualModel {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            store: RwLock::new(VisualStore::default()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Restore a model from persisted parts
    pub fn from_parts(
        id: impl Into<String>,
        entities: impl IntoIterator<Item = VisualEntity>,
        colors: IndexMap<String, Color>,
    ) -> ModelResult<Self> {
        Ok(Self {
            id: id.into(),
            store: RwLock::new(VisualStore::from_parts(entities, colors)?),
            listeners: ListenerRegistry::new(),
        })
    }

    fn next_identifier() -> String {
        uuid::Uuid::new_v4().to_string()
    }

    fn add(&self, entity: VisualEntity) -> ModelResult<String> {
        let identifier = entity.identifier().to_string();
        self.store.write().insert(entity.clone())?;
        self.notify_entities(vec![VisualEntityChange::created(entity)]);
        Ok(identifier)
    }

    fn notify_entities(&self, changes: Vec<VisualEntityChange>) {
        tracing::debug!(model = %self.id, changes = changes.len(), "Visual entities changed");
        self.listeners
            .emit(|listener| listener.visual_entities_did_change(&changes));
    }
}

impl VisualModel for InMemoryVisualModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_writable(&self) -> bool {
        true
    }

    fn visual_entities(&self) -> IndexMap<String, VisualEntity> {
        self.store.read().entities().clone()
    }

    fn visual_entity(&self, identifier: &str) -> Option<VisualEntity> {
        self.store.read().get(identifier).cloned()
    }

    fn visual_node_for_represented(&self, represented: &str) -> Option<VisualNode> {
        self.store.read().node_for_represented(represented).cloned()
    }

    fn visual_relationship_for_represented(&self, represented: &str) -> Option<VisualRelationship> {
        self.store
            .read()
            .relationship_for_represented(represented)
            .cloned()
    }

    fn add_visual_node(&self, spec: VisualNodeSpec) -> ModelResult<String> {
        self.add(VisualEntity::VisualNode(VisualNode {
            identifier: Self::next_identifier(),
            model: spec.model,
            represented_entity: spec.represented_entity,
            position: spec.position,
            content: spec.content,
            visual_models: spec.visual_models,
        }))
    }

    fn add_visual_relationship(&self, spec: VisualRelationshipSpec) -> ModelResult<String> {
        self.add(VisualEntity::VisualRelationship(VisualRelationship {
            identifier: Self::next_identifier(),
            model: spec.model,
            represented_relationship: spec.represented_relationship,
            waypoints: spec.waypoints,
        }))
    }

    fn update_visual_entity(&self, identifier: &str, update: VisualEntityUpdate) -> ModelResult<()> {
        let changed = self.store.write().update(identifier, update)?;
        if let Some((previous, next)) = changed {
            self.notify_entities(vec![VisualEntityChange::updated(previous, next)]);
        }
        Ok(())
    }

    fn delete_visual_entity(&self, identifier: &str) -> ModelResult<()> {
        let removed = self.store.write().remove(identifier)?;
        self.notify_entities(vec![VisualEntityChange::deleted(removed)]);
        Ok(())
    }

    fn model_color(&self, model_id: &str) -> Option<Color> {
        self.store.read().colors().get(model_id).copied()
    }

    fn set_model_color(&self, model_id: &str, color: Option<Color>) -> ModelResult<()> {
        let changed = {
            let mut store = self.store.write();
            let previous = match color {
                Some(color) => store.colors.insert(model_id.to_string(), color),
                None => store.colors.shift_remove(model_id),
            };
            previous != color
        };
        if changed {
            tracing::debug!(model = %self.id, entity_model = model_id, ?color, "Model color changed");
            self.listeners
                .emit(|listener| listener.model_color_did_change(model_id, color));
        }
        Ok(())
    }

    fn model_colors(&self) -> IndexMap<String, Color> {
        self.store.read().colors().clone()
    }

    fn subscribe_to_changes(&self, listener: Arc<dyn VisualModelListener>) -> Subscription {
        self.listeners.register(listener)
    }

    fn snapshot(&self) -> ModelSnapshot {
        let store = self.store.read();
        ModelSnapshot::Visual {
            id: self.id.clone(),
            writable: true,
            entities: store.entities().values().cloned().collect(),
            colors: store.colors().clone(),
        }
    }
}

//! Frozen visual model restored from a snapshot

use super::in_memory::VisualStore;
use super::{
    VisualEntity, VisualEntityUpdate, VisualModel, VisualNode, VisualNodeSpec, VisualRelationship,
    VisualRelationshipSpec,
};
use crate::error::{ModelError, ModelResult};
use crate::events::{ListenerRegistry, Subscription, VisualModelListener};
use crate::model::ModelSnapshot;
use crate::value_objects::Color;
use indexmap::IndexMap;
use std::sync::Arc;

/// Visual model that can be displayed but not edited
///
/// Every mutation fails with [`ModelError::NotWritable`]; listeners are
/// accepted but never notified.
pub struct ReadOnlyVisualModel {
    id: String,
    store: VisualStore,
    listeners: ListenerRegistry<dyn VisualModelListener>,
}

impl ReadOnlyVisualModel {
    pub fn from_parts(
        id: impl Into<String>,
        entities: impl IntoIterator<Item = VisualEntity>,
        colors: IndexMap<String, Color>,
    ) -> ModelResult<Self> {
        Ok(Self {
            id: id.into(),
            store: VisualStore::from_parts(entities, colors)?,
            listeners: ListenerRegistry::new(),
        })
    }

    fn reject<T>(&self, action: &str) -> ModelResult<T> {
        tracing::warn!(model = %self.id, action, "Mutation of read-only visual model");
        Err(ModelError::NotWritable(self.id.clone()))
    }
}

impl VisualModel for ReadOnlyVisualModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn is_writable(&self) -> bool {
        false
    }

    fn visual_entities(&self) -> IndexMap<String, VisualEntity> {
        self.store.entities().clone()
    }

    fn visual_entity(&self, identifier: &str) -> Option<VisualEntity> {
        self.store.get(identifier).cloned()
    }

    fn visual_node_for_represented(&self, represented: &str) -> Option<VisualNode> {
        self.store.node_for_represented(represented).cloned()
    }

    fn visual_relationship_for_represented(&self, represented: &str) -> Option<VisualRelationship> {
        self.store.relationship_for_represented(represented).cloned()
    }

    fn add_visual_node(&self, _spec: VisualNodeSpec) -> ModelResult<String> {
        self.reject("add-visual-node")
    }

    fn add_visual_relationship(&self, _spec: VisualRelationshipSpec) -> ModelResult<String> {
        self.reject("add-visual-relationship")
    }

    fn update_visual_entity(&self, _identifier: &str, _update: VisualEntityUpdate) -> ModelResult<()> {
        self.reject("update-visual-entity")
    }

    fn delete_visual_entity(&self, _identifier: &str) -> ModelResult<()> {
        self.reject("delete-visual-entity")
    }

    fn model_color(&self, model_id: &str) -> Option<Color> {
        self.store.colors().get(model_id).copied()
    }

    fn set_model_color(&self, _model_id: &str, _color: Option<Color>) -> ModelResult<()> {
        self.reject("set-model-color")
    }

    fn model_colors(&self) -> IndexMap<String, Color> {
        self.store.colors().clone()
    }

    fn subscribe_to_changes(&self, listener: Arc<dyn VisualModelListener>) -> Subscription {
        self.listeners.register(listener)
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::Visual {
            id: self.id.clone(),
            writable: false,
            entities: self.store.entities().values().cloned().collect(),
            colors: self.store.colors().clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value_objects::Position;

    fn node(identifier: &str, represented: &str) -> VisualEntity {
        VisualEntity::VisualNode(VisualNode {
            identifier: identifier.to_string(),
            model: "local".to_string(),
            represented_entity: represented.to_string(),
            position: Position::new(10.0, 20.0),
            content: Vec::new(),
            visual_models: Vec::new(),
        })
    }

    #[test]
    fn test_reads_delegate_to_snapshot() {
        let model =
            ReadOnlyVisualModel::from_parts("frozen", vec![node("v1", "c1")], IndexMap::new()).unwrap();

        assert!(!model.is_writable());
        assert_eq!(model.visual_node_for_represented("c1").unwrap().identifier, "v1");
        assert!(matches!(
            model.snapshot(),
            ModelSnapshot::Visual { writable: false, .. }
        ));
    }

    #[test]
    fn test_mutations_fail_not_writable() {
        let model =
            ReadOnlyVisualModel::from_parts("frozen", vec![node("v1", "c1")], IndexMap::new()).unwrap();
        let expected = Err(ModelError::NotWritable("frozen".to_string()));

        assert_eq!(
            model.update_visual_entity("v1", VisualEntityUpdate::position(Position::default())),
            expected
        );
        assert_eq!(model.delete_visual_entity("v1"), expected);
        assert_eq!(model.set_model_color("local", None), expected);
        assert!(model
            .add_visual_node(VisualNodeSpec::new("local", "c2", Position::default()))
            .is_err());
        assert_eq!(model.visual_entities().len(), 1);
    }

    #[test]
    fn test_duplicate_representation_rejected_on_restore() {
        let result = ReadOnlyVisualModel::from_parts(
            "frozen",
            vec![node("v1", "c1"), node("v2", "c1")],
            IndexMap::new(),
        );
        assert!(matches!(result, Err(ModelError::AlreadyRepresented(_))));
    }
}

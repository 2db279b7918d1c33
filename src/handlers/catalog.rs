//! Catalog actions: showing and hiding entities in the active visual model

use crate::error::{ModelError, ModelResult};
use crate::resolver::is_attribute;
use crate::semantic::Entity;
use crate::sync::DiagramSynchronizer;
use crate::value_objects::Position;
use crate::visual::{VisualNodeSpec, VisualRelationshipSpec};
use tracing::info;

impl DiagramSynchronizer {
    /// Show an entity in the active visual model, returning the identifier of
    /// the new visual entity
    ///
    /// Classes and class profiles become nodes at `position`; relationships,
    /// relationship profiles and generalizations become edges. Attributes are
    /// shown inside their class and are rejected.
    pub fn add_to_view(&mut self, entity_id: &str, position: Position) -> ModelResult<String> {
        self.process_pending();
        let result = self.add_entity(entity_id, position);
        let result = self.report(result);
        self.process_pending();
        result
    }

    /// Show the link from a class profile to the class it profiles
    pub fn show_profile_link(&mut self, profile_id: &str) -> ModelResult<String> {
        self.process_pending();
        let result = self.add_profile_link(profile_id);
        let result = self.report(result);
        self.process_pending();
        result
    }

    /// Hide an entity; removes its node and its edge from the active model
    pub fn remove_from_view(&mut self, entity_id: &str) -> ModelResult<()> {
        self.process_pending();
        let result = self.remove_entity(entity_id);
        let result = self.report(result);
        self.process_pending();
        result
    }

    fn add_entity(&self, entity_id: &str, position: Position) -> ModelResult<String> {
        let model = self.writable_active_model()?;
        let aggregated = self
            .view
            .entity(entity_id)
            .ok_or_else(|| ModelError::UnresolvedReference(entity_id.to_string()))?;

        let identifier = match aggregated.entity() {
            Entity::Class(_) | Entity::ClassUsage(_) => model.add_visual_node(VisualNodeSpec::new(
                aggregated.model.clone(),
                entity_id,
                position,
            ))?,
            entity @ (Entity::Relationship(_) | Entity::RelationshipUsage(_))
                if is_attribute(entity) =>
            {
                return Err(ModelError::OperationRejected(format!(
                    "{entity_id} is an attribute and is shown inside its class"
                )));
            }
            Entity::Relationship(_) | Entity::RelationshipUsage(_) | Entity::Generalization(_) => {
                model.add_visual_relationship(VisualRelationshipSpec::new(
                    aggregated.model.clone(),
                    entity_id,
                ))?
            }
        };
        info!(entity = entity_id, visual = %identifier, "Entity added to view");
        Ok(identifier)
    }

    fn add_profile_link(&self, profile_id: &str) -> ModelResult<String> {
        let model = self.writable_active_model()?;
        let aggregated = self
            .view
            .entity(profile_id)
            .ok_or_else(|| ModelError::UnresolvedReference(profile_id.to_string()))?;
        if !matches!(aggregated.raw_entity, Entity::ClassUsage(_)) {
            return Err(ModelError::OperationRejected(format!(
                "{profile_id} is not a class profile"
            )));
        }
        model.add_visual_relationship(VisualRelationshipSpec::new(aggregated.model, profile_id))
    }

    fn remove_entity(&self, entity_id: &str) -> ModelResult<()> {
        let model = self.writable_active_model()?;
        let node = model.visual_node_for_represented(entity_id);
        let relationship = model.visual_relationship_for_represented(entity_id);
        if node.is_none() && relationship.is_none() {
            return Err(ModelError::UnknownVisualEntity(entity_id.to_string()));
        }
        if let Some(node) = node {
            model.delete_visual_entity(&node.identifier)?;
        }
        if let Some(relationship) = relationship {
            model.delete_visual_entity(&relationship.identifier)?;
        }
        info!(entity = entity_id, "Entity removed from view");
        Ok(())
    }
}

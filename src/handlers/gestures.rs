//! Diagram gestures

use super::ConnectionContext;
use crate::error::{ModelError, ModelResult};
use crate::sync::DiagramSynchronizer;
use crate::value_objects::Position;
use crate::visual::{VisualEntityUpdate, VisualRelationshipSpec};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// User interaction reported by the diagram surface
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "gesture", rename_all = "kebab-case")]
pub enum DiagramGesture {
    /// A connection was drawn from one node to another
    Connect { source: String, target: String },
    /// A node was dropped after dragging
    NodeDragStop { node: String, position: Position },
    /// The selected nodes and edges changed
    SelectionChange {
        #[serde(default)]
        nodes: Vec<String>,
        #[serde(default)]
        edges: Vec<String>,
    },
}

impl DiagramSynchronizer {
    /// Write a gesture back to the models, then process the resulting changes
    pub fn handle_gesture(&mut self, gesture: DiagramGesture) -> ModelResult<()> {
        self.process_pending();
        let result = match gesture {
            DiagramGesture::Connect { source, target } => self.connect(&source, &target),
            DiagramGesture::NodeDragStop { node, position } => self.move_node(&node, position),
            DiagramGesture::SelectionChange { nodes, edges } => {
                self.selection = nodes.into_iter().chain(edges).collect();
                Ok(())
            }
        };
        let result = self.report(result);
        self.process_pending();
        result
    }

    fn move_node(&self, node_id: &str, position: Position) -> ModelResult<()> {
        let model = self.writable_active_model()?;
        let visual = model
            .visual_node_for_represented(node_id)
            .ok_or_else(|| ModelError::UnknownVisualEntity(node_id.to_string()))?;
        if visual.position.same_location(&position) {
            debug!(node = node_id, "Node dropped where it was");
            return Ok(());
        }
        // Dragging moves a node, it does not change whether it is anchored
        let position = Position {
            anchored: visual.position.anchored,
            ..position
        };
        model.update_visual_entity(&visual.identifier, VisualEntityUpdate::position(position))
    }

    fn connect(&self, source: &str, target: &str) -> ModelResult<()> {
        let model = self.writable_active_model()?;
        let Some(dialog) = &self.dialog else {
            warn!(source, target, "No connection dialog attached");
            return Ok(());
        };

        let context = ConnectionContext {
            source: source.to_string(),
            target: target.to_string(),
            source_entity: self.view.entity(source),
            target_entity: self.view.entity(target),
            writable_models: self
                .view
                .semantic_models()
                .iter()
                .filter(|model| !model.is_read_only())
                .map(|model| model.id().to_string())
                .collect(),
        };
        let Some(request) = dialog.open(&context) else {
            debug!(source, target, "Connection cancelled");
            return Ok(());
        };

        let semantic = self
            .view
            .aggregator()
            .model(&request.model_id)
            .ok_or_else(|| ModelError::UnknownModel(request.model_id.clone()))?;
        let operation = request.operation.name();
        let created = semantic
            .execute_operation(request.operation)?
            .id
            .ok_or_else(|| {
                ModelError::OperationRejected(format!("{operation} did not report an entity id"))
            })?;

        model.add_visual_relationship(VisualRelationshipSpec::new(
            request.model_id.clone(),
            created.clone(),
        ))?;
        info!(model = %request.model_id, entity = %created, operation, "Connection created");
        Ok(())
    }
}

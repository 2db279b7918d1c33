//! Semantic to visual synchronization
//!
//! The [`DiagramSynchronizer`] keeps a [`DiagramProjection`] consistent with
//! the aggregated entities and the active visual model. Every source it
//! listens to pushes a [`SyncEvent`] into one channel; the synchronizer drains
//! that channel in order in [`DiagramSynchronizer::process_pending`]. Writes
//! it performs while draining (cascading deletes, write-back of gestures)
//! enqueue further events that are handled in the same drain loop.

mod index;
mod synthesis;

use crate::aggregator::AggregatorView;
use crate::events::{AggregatedChanges, Subscription, VisualEntityChange, VisualModelListener};
use crate::handlers::{ConnectionDialog, TracingNotifier, UserNotifier};
use crate::projections::{Diagram, DiagramProjection, DiagramSurface};
use crate::resolver::is_attribute;
use crate::value_objects::Color;
use crate::visual::{VisualEntity, VisualModel};
use crossbeam::channel::{unbounded, Receiver, Sender};
use index::SemanticIndex;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use synthesis::Synthesis;
use tracing::{debug, info, warn};

/// Lifecycle of the synchronizer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SyncState {
    /// No active visual model, the diagram is empty
    Uninitialized,
    /// The diagram was rebuilt from a newly activated visual model
    Loaded,
    /// At least one change batch was applied since the last rebuild
    Synced,
}

/// Change queued for the synchronizer
#[derive(Debug, Clone, PartialEq)]
pub enum SyncEvent {
    /// The aggregated entities changed
    Semantic(AggregatedChanges),
    /// Visual entities of a visual model changed
    Visual {
        model: String,
        changes: Vec<VisualEntityChange>,
    },
    /// A visual model assigned a new color to an entity model
    Color {
        model: String,
        entity_model: String,
        color: Option<Color>,
    },
    /// The view switched its active visual model
    ActiveModel(Option<String>),
}

/// Presentation settings used while deriving the diagram
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncSettings {
    /// Language labels are taken in, falling back to any other
    pub language: String,
    /// Color of nodes whose entity model has none assigned
    pub default_color: Color,
}

impl Default for SyncSettings {
    fn default() -> Self {
        Self {
            language: "en".to_string(),
            default_color: Color::WHITE,
        }
    }
}

/// Forwards visual model notifications into the event channel
struct VisualEvents {
    model: String,
    sender: Sender<SyncEvent>,
}

impl VisualModelListener for VisualEvents {
    fn visual_entities_did_change(&self, changes: &[VisualEntityChange]) {
        let event = SyncEvent::Visual {
            model: self.model.clone(),
            changes: changes.to_vec(),
        };
        if self.sender.send(event).is_err() {
            debug!(model = %self.model, "Synchronizer gone, dropping visual change");
        }
    }

    fn model_color_did_change(&self, model_id: &str, color: Option<Color>) {
        let event = SyncEvent::Color {
            model: self.model.clone(),
            entity_model: model_id.to_string(),
            color,
        };
        if self.sender.send(event).is_err() {
            debug!(model = %self.model, "Synchronizer gone, dropping color change");
        }
    }
}

/// Bidirectional bridge between the aggregated entities, the active visual
/// model and the diagram surface
pub struct DiagramSynchronizer {
    pub(crate) view: AggregatorView,
    pub(crate) settings: SyncSettings,
    pub(crate) notifier: Arc<dyn UserNotifier>,
    pub(crate) dialog: Option<Arc<dyn ConnectionDialog>>,
    pub(crate) selection: Vec<String>,
    surface: Option<Arc<dyn DiagramSurface>>,
    state: SyncState,
    index: SemanticIndex,
    projection: DiagramProjection,
    active: Option<Arc<dyn VisualModel>>,
    sender: Sender<SyncEvent>,
    receiver: Receiver<SyncEvent>,
    subscriptions: Vec<Subscription>,
    visual_subscription: Option<Subscription>,
}

impl DiagramSynchronizer {
    /// Start listening to `view`
    ///
    /// When the view already has an active visual model the diagram is built
    /// on the first [`process_pending`](Self::process_pending).
    pub fn new(view: AggregatorView, settings: SyncSettings) -> Self {
        let (sender, receiver) = unbounded();

        let semantic = sender.clone();
        let aggregator_subscription =
            view.subscribe_to_changes(Arc::new(move |changes: &AggregatedChanges| {
                if semantic.send(SyncEvent::Semantic(changes.clone())).is_err() {
                    debug!("Synchronizer gone, dropping aggregated change");
                }
            }));
        let active = sender.clone();
        let active_subscription =
            view.subscribe_to_active_visual_model(Arc::new(move |model_id: Option<&str>| {
                let event = SyncEvent::ActiveModel(model_id.map(str::to_string));
                if active.send(event).is_err() {
                    debug!("Synchronizer gone, dropping active model change");
                }
            }));

        let index = SemanticIndex::from_entities(view.entities());
        if let Some(model_id) = view.active_visual_model_id() {
            // Receiver is alive, the send cannot fail
            let _ = sender.send(SyncEvent::ActiveModel(Some(model_id)));
        }

        Self {
            view,
            settings,
            notifier: Arc::new(TracingNotifier),
            dialog: None,
            selection: Vec::new(),
            surface: None,
            state: SyncState::Uninitialized,
            index,
            projection: DiagramProjection::new(),
            active: None,
            sender,
            receiver,
            subscriptions: vec![aggregator_subscription, active_subscription],
            visual_subscription: None,
        }
    }

    pub fn with_surface(mut self, surface: Arc<dyn DiagramSurface>) -> Self {
        self.surface = Some(surface);
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn UserNotifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_connection_dialog(mut self, dialog: Arc<dyn ConnectionDialog>) -> Self {
        self.dialog = Some(dialog);
        self
    }

    pub fn state(&self) -> SyncState {
        self.state
    }

    pub fn view(&self) -> &AggregatorView {
        &self.view
    }

    pub fn projection(&self) -> &DiagramProjection {
        &self.projection
    }

    pub fn diagram(&self) -> Diagram {
        self.projection.to_diagram()
    }

    /// Ids of the currently selected nodes and edges
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    /// Visual model the diagram is currently derived from
    pub fn active_visual_model(&self) -> Option<&Arc<dyn VisualModel>> {
        self.active.as_ref()
    }

    /// Handle every queued event, in order, and return how many were handled
    ///
    /// The surface is rendered once afterwards if anything was handled.
    pub fn process_pending(&mut self) -> usize {
        let mut processed = 0;
        while let Ok(event) = self.receiver.try_recv() {
            self.handle_event(event);
            processed += 1;
        }
        if processed > 0 {
            if let Some(surface) = &self.surface {
                surface.render(&self.projection.to_diagram());
            }
        }
        processed
    }

    /// Rebuild the whole diagram from the active visual model
    pub fn full_reset(&mut self) {
        self.projection.clear();
        let Some(model) = self.active.clone() else {
            return;
        };
        let entities = model.visual_entities();
        let synthesis = Synthesis {
            index: &self.index,
            language: &self.settings.language,
        };

        // Nodes first, edges check that both endpoints exist
        for entity in entities.values() {
            if let VisualEntity::VisualNode(visual) = entity {
                let color = self.color_of(model.as_ref(), &visual.model);
                if let Some(node) = synthesis.node(visual, color) {
                    self.projection.upsert_node(node);
                }
            }
        }
        for entity in entities.values() {
            if let VisualEntity::VisualRelationship(visual) = entity {
                let color = self.color_of(model.as_ref(), &visual.model);
                if let Some(edge) = synthesis.edge(visual, color, &self.projection) {
                    self.projection.upsert_edge(edge);
                }
            }
        }
        info!(
            model = model.id(),
            nodes = self.projection.node_count(),
            edges = self.projection.edge_count(),
            "Diagram rebuilt"
        );
    }

    fn handle_event(&mut self, event: SyncEvent) {
        match event {
            SyncEvent::ActiveModel(model_id) => self.activate(model_id.as_deref()),
            SyncEvent::Semantic(changes) => {
                self.apply_semantic_changes(changes);
                self.mark_synced();
            }
            SyncEvent::Visual { model, changes } => {
                if !self.is_active(&model) {
                    debug!(%model, "Ignoring change of inactive visual model");
                    return;
                }
                for change in &changes {
                    self.apply_visual_change(change);
                }
                self.mark_synced();
            }
            SyncEvent::Color {
                model,
                entity_model,
                ..
            } => {
                if !self.is_active(&model) {
                    return;
                }
                self.rederive_model(&entity_model);
                self.mark_synced();
            }
        }
    }

    fn activate(&mut self, model_id: Option<&str>) {
        if let Some(subscription) = self.visual_subscription.take() {
            subscription.unsubscribe();
        }
        self.state = SyncState::Uninitialized;
        self.active = None;
        self.projection.clear();

        let Some(model_id) = model_id else {
            info!("No active visual model");
            return;
        };
        let Some(model) = self.view.aggregator().visual_model(model_id) else {
            warn!(model = model_id, "Active visual model is not registered");
            return;
        };

        self.visual_subscription = Some(model.subscribe_to_changes(Arc::new(VisualEvents {
            model: model_id.to_string(),
            sender: self.sender.clone(),
        })));
        self.active = Some(model);
        self.full_reset();
        self.state = SyncState::Loaded;
    }

    fn mark_synced(&mut self) {
        if self.state == SyncState::Loaded {
            self.state = SyncState::Synced;
        }
    }

    fn is_active(&self, model_id: &str) -> bool {
        self.active
            .as_ref()
            .is_some_and(|model| model.id() == model_id)
    }

    fn color_of(&self, model: &dyn VisualModel, entity_model: &str) -> String {
        model
            .model_color(entity_model)
            .unwrap_or(self.settings.default_color)
            .to_hex()
    }

    fn apply_semantic_changes(&mut self, changes: AggregatedChanges) {
        for id in &changes.removed {
            self.remove_semantic(id);
        }
        for entity in changes.updated {
            let id = entity.id.clone();
            let attribute = is_attribute(entity.entity());
            let previous_domain = self.index.upsert(entity);

            if attribute {
                if let Some(domain) = self.index.attribute_domain(&id).map(str::to_string) {
                    self.regenerate_node(&domain);
                }
                if let Some(previous) = previous_domain {
                    self.regenerate_node(&previous);
                }
                // An attribute is never an edge
                self.regenerate_edge(&id);
                continue;
            }
            if let Some(previous) = previous_domain {
                self.regenerate_node(&previous);
            }
            self.regenerate_node(&id);
            self.regenerate_edge(&id);
            for profile in self.index.profiles_of(&id) {
                self.regenerate_node(&profile);
            }
        }
    }

    /// Drop a removed semantic entity from the diagram and the active model
    fn remove_semantic(&mut self, id: &str) {
        let removed_domain = self.index.remove(id).and_then(|(_, domain)| domain);
        if let Some(domain) = removed_domain {
            self.regenerate_node(&domain);
        }

        // Edges attached to the removed node go with it
        let mut edges = vec![id.to_string()];
        if self.projection.remove_node(id).is_some() {
            for edge in self.projection.edges_touching(id) {
                self.projection.remove_edge(&edge);
                edges.push(edge);
            }
        }
        self.projection.remove_edge(id);
        for profile in self.index.profiles_of(id) {
            self.regenerate_node(&profile);
        }

        let Some(model) = self.active.clone() else {
            return;
        };
        let mut identifiers: Vec<String> = Vec::new();
        if let Some(node) = model.visual_node_for_represented(id) {
            identifiers.push(node.identifier);
        }
        for edge in &edges {
            if let Some(relationship) = model.visual_relationship_for_represented(edge) {
                identifiers.push(relationship.identifier);
            }
        }
        for identifier in identifiers {
            if let Err(error) = model.delete_visual_entity(&identifier) {
                debug!(%identifier, %error, "Visual entity of removed entity kept");
            }
        }
    }

    fn apply_visual_change(&mut self, change: &VisualEntityChange) {
        let entity = change.next.as_ref().or(change.previous.as_ref());
        match entity {
            Some(VisualEntity::VisualNode(node)) => {
                let represented = node.represented_entity.clone();
                self.regenerate_node(&represented);
            }
            Some(VisualEntity::VisualRelationship(relationship)) => {
                let represented = relationship.represented_relationship.clone();
                self.regenerate_edge(&represented);
            }
            None => {}
        }
    }

    /// Re-derive every item drawn for an entity model after a color change
    fn rederive_model(&mut self, entity_model: &str) {
        let Some(model) = self.active.clone() else {
            return;
        };
        for entity in model.visual_entities().values() {
            if entity.model() != entity_model {
                continue;
            }
            match entity {
                VisualEntity::VisualNode(node) => self.regenerate_node(&node.represented_entity),
                VisualEntity::VisualRelationship(relationship) => {
                    self.regenerate_edge(&relationship.represented_relationship)
                }
            }
        }
    }

    /// Bring the node of `entity_id` in line with the active model
    fn regenerate_node(&mut self, entity_id: &str) {
        let Some(model) = self.active.clone() else {
            return;
        };
        let node = model.visual_node_for_represented(entity_id).and_then(|visual| {
            let color = self.color_of(model.as_ref(), &visual.model);
            Synthesis {
                index: &self.index,
                language: &self.settings.language,
            }
            .node(&visual, color)
        });

        match node {
            Some(node) => {
                let created = !self.projection.contains_node(entity_id);
                self.projection.upsert_node(node);
                if created {
                    self.rederive_edges_touching(entity_id);
                }
            }
            None => {
                if self.projection.remove_node(entity_id).is_some() {
                    for edge in self.projection.edges_touching(entity_id) {
                        self.projection.remove_edge(&edge);
                    }
                }
            }
        }
    }

    /// Bring the edge of `entity_id` in line with the active model
    fn regenerate_edge(&mut self, entity_id: &str) {
        let Some(model) = self.active.clone() else {
            return;
        };
        let edge = model
            .visual_relationship_for_represented(entity_id)
            .and_then(|visual| {
                let color = self.color_of(model.as_ref(), &visual.model);
                Synthesis {
                    index: &self.index,
                    language: &self.settings.language,
                }
                .edge(&visual, color, &self.projection)
            });

        match edge {
            Some(edge) => self.projection.upsert_edge(edge),
            None => {
                self.projection.remove_edge(entity_id);
            }
        }
    }

    /// Derive the edges that could not be drawn while a node was missing
    fn rederive_edges_touching(&mut self, node_id: &str) {
        let Some(model) = self.active.clone() else {
            return;
        };
        for entity in model.visual_entities().values() {
            let VisualEntity::VisualRelationship(visual) = entity else {
                continue;
            };
            let color = self.color_of(model.as_ref(), &visual.model);
            let edge = Synthesis {
                index: &self.index,
                language: &self.settings.language,
            }
            .edge(visual, color, &self.projection);
            if let Some(edge) = edge.filter(|edge| edge.touches(node_id)) {
                self.projection.upsert_edge(edge);
            }
        }
    }
}

impl Drop for DiagramSynchronizer {
    fn drop(&mut self) {
        for subscription in self.subscriptions.drain(..) {
            subscription.unsubscribe();
        }
        if let Some(subscription) = self.visual_subscription.take() {
            subscription.unsubscribe();
        }
    }
}

//! Aggregation of entity models
//!
//! The aggregator merges every registered entity model into one view keyed by
//! entity id and resolves profiles across models: a class profile inherits the
//! IRI, name and description of the class it profiles, a relationship profile
//! additionally inherits the fields of each end. Changes of any model are
//! recomputed incrementally and reported as [`AggregatedChanges`].

mod view;

pub use view::AggregatorView;

use crate::error::{ModelError, ModelResult};
use crate::events::{
    AggregatedChanges, AggregatorListener, EntityModelChanges, ListenerRegistry, Subscription,
    VisualModelRegistration, VisualModelRegistryListener,
};
use crate::model::{EntityModel, ModelSnapshot};
use crate::semantic::{ClassUsage, Entity, RelationshipUsage};
use crate::value_objects::LanguageString;
use crate::visual::VisualModel;
use indexmap::{IndexMap, IndexSet};
use parking_lot::{ReentrantMutex, RwLock};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};

/// Entity as seen through the aggregator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregatedEntity {
    pub id: String,
    /// Model defining the entity
    pub model: String,
    /// Entity with profile fields resolved; `None` when the profiled entity is
    /// unknown, of an incompatible kind, or the profile chain is cyclic
    pub aggregated_entity: Option<Entity>,
    /// Entity exactly as its model defines it
    pub raw_entity: Entity,
}

impl AggregatedEntity {
    /// Resolved entity, falling back to the raw one
    pub fn entity(&self) -> &Entity {
        self.aggregated_entity.as_ref().unwrap_or(&self.raw_entity)
    }

    pub fn is_resolved(&self) -> bool {
        self.aggregated_entity.is_some()
    }
}

/// An entity id defined by more than one model
///
/// The first model to define an id owns it; later definitions are ignored
/// until the owner releases the id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EntityConflict {
    pub id: String,
    pub owner: String,
    pub contender: String,
}

struct RegisteredModel {
    model: Arc<dyn EntityModel>,
    subscription: Option<Subscription>,
}

/// Raw entity of an id after a change, with its owning model
type RawChange = (String, Option<(String, Entity)>);

#[derive(Default)]
struct AggregatorState {
    models: IndexMap<String, RegisteredModel>,
    visual_models: IndexMap<String, Arc<dyn VisualModel>>,
    owners: HashMap<String, String>,
    entities: IndexMap<String, AggregatedEntity>,
    /// Profiled id -> ids of the profiles pointing at it
    dependents: HashMap<String, IndexSet<String>>,
    conflicts: Vec<EntityConflict>,
}

impl AggregatorState {
    fn check_ownership(&self, model_id: &str, entities: &IndexMap<String, Entity>) -> ModelResult<()> {
        for id in entities.keys() {
            if let Some(owner) = self.owners.get(id) {
                if owner != model_id {
                    return Err(ModelError::DuplicateEntityId {
                        id: id.clone(),
                        existing_model: owner.clone(),
                    });
                }
            }
        }
        Ok(())
    }

    fn apply_model_changes(&mut self, model_id: &str, changes: &EntityModelChanges) -> AggregatedChanges {
        let mut raw_changes: Vec<RawChange> = Vec::new();

        for entity in &changes.updated {
            let id = entity.id();
            match self.owners.get(id) {
                Some(owner) if owner != model_id => {
                    let owner = owner.clone();
                    self.record_conflict(id, &owner, model_id);
                    continue;
                }
                Some(_) => {}
                None => {
                    self.owners.insert(id.to_string(), model_id.to_string());
                }
            }
            raw_changes.push((id.to_string(), Some((model_id.to_string(), entity.clone()))));
        }

        for id in &changes.removed {
            if self.owners.get(id).map(String::as_str) != Some(model_id) {
                self.conflicts
                    .retain(|conflict| !(conflict.id == *id && conflict.contender == model_id));
                continue;
            }
            self.owners.remove(id);
            let successor = self.find_successor(id, model_id);
            raw_changes.push((id.clone(), successor));
        }

        self.apply_raw_changes(raw_changes)
    }

    fn remove_model(&mut self, model_id: &str) -> AggregatedChanges {
        self.conflicts.retain(|conflict| conflict.contender != model_id);
        let owned: Vec<String> = self
            .entities
            .values()
            .filter(|entity| entity.model == model_id)
            .map(|entity| entity.id.clone())
            .collect();

        let mut raw_changes: Vec<RawChange> = Vec::with_capacity(owned.len());
        for id in owned {
            self.owners.remove(&id);
            let successor = self.find_successor(&id, model_id);
            raw_changes.push((id, successor));
        }
        self.apply_raw_changes(raw_changes)
    }

    fn record_conflict(&mut self, id: &str, owner: &str, contender: &str) {
        let known = self
            .conflicts
            .iter()
            .any(|conflict| conflict.id == id && conflict.contender == contender);
        if known {
            return;
        }
        error!(id, owner, contender, "Entity id defined by more than one model, keeping the first");
        self.conflicts.push(EntityConflict {
            id: id.to_string(),
            owner: owner.to_string(),
            contender: contender.to_string(),
        });
    }

    /// Next registered model defining `id`, which becomes its owner
    fn find_successor(&mut self, id: &str, released_by: &str) -> Option<(String, Entity)> {
        let successor = self
            .models
            .iter()
            .filter(|(model_id, _)| model_id.as_str() != released_by)
            .find_map(|(model_id, registered)| {
                registered
                    .model
                    .entity(id)
                    .map(|entity| (model_id.clone(), entity))
            })?;

        let owner = successor.0.clone();
        info!(id, owner = %owner, previous = released_by, "Entity ownership moved");
        self.owners.insert(id.to_string(), owner.clone());
        self.conflicts
            .retain(|conflict| !(conflict.id == id && conflict.contender == owner));
        for conflict in self.conflicts.iter_mut().filter(|conflict| conflict.id == id) {
            conflict.owner = owner.clone();
        }
        Some(successor)
    }

    /// Store new raw entities, then recompute them and every profile depending
    /// on them, reporting what actually changed
    fn apply_raw_changes(&mut self, raw_changes: Vec<RawChange>) -> AggregatedChanges {
        let mut originals: HashMap<String, Option<AggregatedEntity>> = HashMap::new();
        let mut changed: IndexSet<String> = IndexSet::new();

        for (id, raw) in raw_changes {
            let previous = self.set_raw(&id, raw);
            originals.entry(id.clone()).or_insert(previous);
            changed.insert(id);
        }

        let affected = self.with_dependents(changed);
        for id in &affected {
            let aggregated = resolve(&self.entities, id, &mut Vec::new());
            if let Some(entry) = self.entities.get_mut(id) {
                originals
                    .entry(id.clone())
                    .or_insert_with(|| Some(entry.clone()));
                entry.aggregated_entity = aggregated;
            }
        }

        let mut changes = AggregatedChanges::default();
        for id in affected {
            let original = originals.get(&id).and_then(Option::as_ref);
            match (self.entities.get(&id), original) {
                (Some(current), original) if original != Some(current) => {
                    changes.updated.push(current.clone());
                }
                (None, Some(_)) => changes.removed.push(id),
                _ => {}
            }
        }
        changes
    }

    fn set_raw(&mut self, id: &str, raw: Option<(String, Entity)>) -> Option<AggregatedEntity> {
        let previous = match raw {
            Some((model, raw_entity)) => {
                if let Some(base) = raw_entity.usage_of() {
                    self.dependents
                        .entry(base.to_string())
                        .or_default()
                        .insert(id.to_string());
                }
                let entry = AggregatedEntity {
                    id: id.to_string(),
                    model,
                    aggregated_entity: None,
                    raw_entity,
                };
                match self.entities.get_mut(id) {
                    Some(existing) => Some(std::mem::replace(existing, entry)),
                    None => {
                        self.entities.insert(id.to_string(), entry);
                        None
                    }
                }
            }
            None => self.entities.shift_remove(id),
        };

        let previous_base = previous
            .as_ref()
            .and_then(|entry| entry.raw_entity.usage_of());
        let current_base = self
            .entities
            .get(id)
            .and_then(|entry| entry.raw_entity.usage_of());
        if let Some(previous_base) = previous_base {
            if current_base != Some(previous_base) {
                if let Some(profiles) = self.dependents.get_mut(previous_base) {
                    profiles.shift_remove(id);
                    if profiles.is_empty() {
                        self.dependents.remove(previous_base);
                    }
                }
            }
        }
        previous
    }

    /// `ids` followed by every profile transitively depending on them
    fn with_dependents(&self, ids: IndexSet<String>) -> IndexSet<String> {
        let mut affected = ids;
        let mut next = 0;
        while next < affected.len() {
            let dependents: Vec<String> = affected
                .get_index(next)
                .and_then(|id| self.dependents.get(id))
                .map(|profiles| profiles.iter().cloned().collect())
                .unwrap_or_default();
            affected.extend(dependents);
            next += 1;
        }
        affected
    }
}

/// Resolve profile fields of `id` through its chain of profiled entities
fn resolve(entities: &IndexMap<String, AggregatedEntity>, id: &str, visiting: &mut Vec<String>) -> Option<Entity> {
    if visiting.iter().any(|seen| seen == id) {
        debug!(id, "Profile cycle");
        return None;
    }
    let raw = &entities.get(id)?.raw_entity;
    match raw {
        Entity::Class(_) | Entity::Relationship(_) | Entity::Generalization(_) => Some(raw.clone()),
        Entity::ClassUsage(usage) => {
            visiting.push(id.to_string());
            let base = resolve(entities, &usage.usage_of, visiting);
            visiting.pop();
            merge_class_usage(usage, &base?)
        }
        Entity::RelationshipUsage(usage) => {
            visiting.push(id.to_string());
            let base = resolve(entities, &usage.usage_of, visiting);
            visiting.pop();
            merge_relationship_usage(usage, &base?)
        }
    }
}

fn merge_class_usage(usage: &ClassUsage, base: &Entity) -> Option<Entity> {
    let (iri, name, description) = match base {
        Entity::Class(class) => (class.iri.as_ref(), Some(&class.name), Some(&class.description)),
        Entity::ClassUsage(profile) => (
            profile.iri.as_ref(),
            profile.name.as_ref(),
            profile.description.as_ref(),
        ),
        Entity::Relationship(_) | Entity::Generalization(_) | Entity::RelationshipUsage(_) => {
            debug!(id = %usage.id, usage_of = %usage.usage_of, kind = %base.kind(), "Class profile of a non-class");
            return None;
        }
    };
    Some(Entity::ClassUsage(ClassUsage {
        id: usage.id.clone(),
        usage_of: usage.usage_of.clone(),
        iri: usage.iri.clone().or_else(|| iri.cloned()),
        name: inherit(usage.name.as_ref(), name),
        description: inherit(usage.description.as_ref(), description),
        usage_note: usage.usage_note.clone(),
    }))
}

fn merge_relationship_usage(usage: &RelationshipUsage, base: &Entity) -> Option<Entity> {
    let (iri, name, description, ends) = match base {
        Entity::Relationship(relationship) => (
            relationship.iri.as_ref(),
            Some(&relationship.name),
            Some(&relationship.description),
            &relationship.ends,
        ),
        Entity::RelationshipUsage(profile) => (
            profile.iri.as_ref(),
            profile.name.as_ref(),
            profile.description.as_ref(),
            &profile.ends,
        ),
        Entity::Class(_) | Entity::Generalization(_) | Entity::ClassUsage(_) => {
            debug!(id = %usage.id, usage_of = %usage.usage_of, kind = %base.kind(), "Relationship profile of a non-relationship");
            return None;
        }
    };
    Some(Entity::RelationshipUsage(RelationshipUsage {
        id: usage.id.clone(),
        usage_of: usage.usage_of.clone(),
        iri: usage.iri.clone().or_else(|| iri.cloned()),
        name: inherit(usage.name.as_ref(), name),
        description: inherit(usage.description.as_ref(), description),
        usage_note: usage.usage_note.clone(),
        ends: [
            usage.ends[0].inherit_from(&ends[0]),
            usage.ends[1].inherit_from(&ends[1]),
        ],
    }))
}

fn inherit(own: Option<&LanguageString>, base: Option<&LanguageString>) -> Option<LanguageString> {
    match own {
        Some(value) if !value.is_empty() => Some(value.clone()),
        _ => base
            .filter(|value| !value.is_empty())
            .or(own)
            .cloned(),
    }
}

struct AggregatorInner {
    state: RwLock<AggregatorState>,
    /// Held while a batch is computed and delivered, so listeners see batches
    /// in mutation order. Reentrant for listeners that mutate models.
    delivery: ReentrantMutex<()>,
    listeners: ListenerRegistry<AggregatorListener>,
    registry_listeners: ListenerRegistry<VisualModelRegistryListener>,
}

impl AggregatorInner {
    fn on_model_changes(&self, model_id: &str, changes: &EntityModelChanges) {
        let _delivery = self.delivery.lock();
        let aggregated = {
            let mut state = self.state.write();
            if !state.models.contains_key(model_id) {
                return;
            }
            state.apply_model_changes(model_id, changes)
        };
        self.emit(&aggregated);
    }

    fn emit(&self, changes: &AggregatedChanges) {
        if changes.is_empty() {
            return;
        }
        debug!(
            updated = changes.updated.len(),
            removed = changes.removed.len(),
            "Aggregated entities changed"
        );
        self.listeners.emit(|listener| listener(changes));
    }
}

/// Merged view over all registered entity and visual models
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct Aggregator {
    inner: Arc<AggregatorInner>,
}

impl Default for Aggregator {
    fn default() -> Self {
        Self::new()
    }
}

impl Aggregator {
    pub fn new() -> Self {
        Self {
            inner: Arc::new(AggregatorInner {
                state: RwLock::new(AggregatorState::default()),
                delivery: ReentrantMutex::new(()),
                listeners: ListenerRegistry::new(),
                registry_listeners: ListenerRegistry::new(),
            }),
        }
    }

    /// Register an entity model and aggregate its entities
    ///
    /// Fails with `DuplicateEntityId`, registering nothing, when the model
    /// defines an id another registered model already owns.
    pub fn add_model(&self, model: Arc<dyn EntityModel>) -> ModelResult<()> {
        let model_id = model.id().to_string();
        let weak: Weak<AggregatorInner> = Arc::downgrade(&self.inner);
        let listener_model = model_id.clone();
        let subscription = model.subscribe_to_changes(Arc::new(move |changes: &EntityModelChanges| {
            if let Some(inner) = weak.upgrade() {
                inner.on_model_changes(&listener_model, changes);
            }
        }));

        let _delivery = self.inner.delivery.lock();
        let registered = {
            let mut state = self.inner.state.write();
            let entities = model.entities();
            let check = if state.models.contains_key(&model_id) {
                Err(ModelError::OperationRejected(format!(
                    "Model {model_id} is already registered"
                )))
            } else {
                state.check_ownership(&model_id, &entities)
            };
            match check {
                Ok(()) => {
                    state.models.insert(
                        model_id.clone(),
                        RegisteredModel {
                            model: Arc::clone(&model),
                            subscription: Some(subscription),
                        },
                    );
                    let changes = EntityModelChanges {
                        updated: entities.into_values().collect(),
                        removed: Vec::new(),
                    };
                    Ok(state.apply_model_changes(&model_id, &changes))
                }
                Err(error) => Err((error, subscription)),
            }
        };

        match registered {
            Ok(changes) => {
                info!(model = %model_id, entities = changes.updated.len(), "Entity model registered");
                self.inner.emit(&changes);
                Ok(())
            }
            Err((error, subscription)) => {
                error!(model = %model_id, %error, "Entity model rejected");
                subscription.unsubscribe();
                Err(error)
            }
        }
    }

    /// Unregister an entity model; its ids pass to other models defining
    /// them or are removed
    pub fn delete_model(&self, model_id: &str) -> ModelResult<()> {
        let _delivery = self.inner.delivery.lock();
        let (registered, changes) = {
            let mut state = self.inner.state.write();
            let registered = state
                .models
                .shift_remove(model_id)
                .ok_or_else(|| ModelError::UnknownModel(model_id.to_string()))?;
            let changes = state.remove_model(model_id);
            (registered, changes)
        };
        if let Some(subscription) = registered.subscription {
            subscription.unsubscribe();
        }
        info!(model = model_id, removed = changes.removed.len(), "Entity model unregistered");
        self.inner.emit(&changes);
        Ok(())
    }

    pub fn add_visual_model(&self, model: Arc<dyn VisualModel>) -> ModelResult<()> {
        let model_id = model.id().to_string();
        {
            let mut state = self.inner.state.write();
            if state.visual_models.contains_key(&model_id) {
                return Err(ModelError::OperationRejected(format!(
                    "Visual model {model_id} is already registered"
                )));
            }
            state.visual_models.insert(model_id.clone(), model);
        }
        info!(model = %model_id, "Visual model registered");
        let registration = VisualModelRegistration::Added(model_id);
        self.inner
            .registry_listeners
            .emit(|listener| listener(&registration));
        Ok(())
    }

    pub fn delete_visual_model(&self, model_id: &str) -> ModelResult<()> {
        self.inner
            .state
            .write()
            .visual_models
            .shift_remove(model_id)
            .ok_or_else(|| ModelError::UnknownVisualModel(model_id.to_string()))?;
        info!(model = model_id, "Visual model unregistered");
        let registration = VisualModelRegistration::Removed(model_id.to_string());
        self.inner
            .registry_listeners
            .emit(|listener| listener(&registration));
        Ok(())
    }

    /// New consumer handle with its own active visual model
    pub fn view(&self) -> AggregatorView {
        AggregatorView::new(self.clone())
    }

    /// Registered entity models, in registration order
    pub fn models(&self) -> Vec<Arc<dyn EntityModel>> {
        self.inner
            .state
            .read()
            .models
            .values()
            .map(|registered| Arc::clone(&registered.model))
            .collect()
    }

    pub fn model(&self, model_id: &str) -> Option<Arc<dyn EntityModel>> {
        self.inner
            .state
            .read()
            .models
            .get(model_id)
            .map(|registered| Arc::clone(&registered.model))
    }

    pub fn visual_models(&self) -> Vec<Arc<dyn VisualModel>> {
        self.inner.state.read().visual_models.values().cloned().collect()
    }

    pub fn visual_model(&self, model_id: &str) -> Option<Arc<dyn VisualModel>> {
        self.inner.state.read().visual_models.get(model_id).cloned()
    }

    pub fn entities(&self) -> IndexMap<String, AggregatedEntity> {
        self.inner.state.read().entities.clone()
    }

    pub fn entity(&self, id: &str) -> Option<AggregatedEntity> {
        self.inner.state.read().entities.get(id).cloned()
    }

    /// Model owning an entity id
    pub fn owner_of(&self, id: &str) -> Option<String> {
        self.inner.state.read().owners.get(id).cloned()
    }

    /// Ids currently defined by more than one model
    pub fn conflicts(&self) -> Vec<EntityConflict> {
        self.inner.state.read().conflicts.clone()
    }

    pub fn subscribe_to_changes(&self, listener: Arc<AggregatorListener>) -> Subscription {
        self.inner.listeners.register(listener)
    }

    pub fn subscribe_to_visual_models(&self, listener: Arc<VisualModelRegistryListener>) -> Subscription {
        self.inner.registry_listeners.register(listener)
    }

    /// Persistable state of every registered model, semantic models first
    ///
    /// Each model is snapshotted under its own lock, so no snapshot contains a
    /// half-applied batch.
    pub fn snapshot(&self) -> Vec<ModelSnapshot> {
        let (models, visual_models) = {
            let state = self.inner.state.read();
            let models: Vec<Arc<dyn EntityModel>> = state
                .models
                .values()
                .map(|registered| Arc::clone(&registered.model))
                .collect();
            let visual_models: Vec<Arc<dyn VisualModel>> =
                state.visual_models.values().cloned().collect();
            (models, visual_models)
        };
        models
            .iter()
            .map(|model| model.snapshot())
            .chain(visual_models.iter().map(|model| model.snapshot()))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::commands::Operation;
    use crate::model::InMemorySemanticModel;
    use crate::semantic::{Class, Relationship, RelationshipEnd};
    use crate::value_objects::Cardinality;
    use parking_lot::Mutex;

    fn class(id: &str, name: &str) -> Entity {
        Entity::Class(Class {
            id: id.to_string(),
            iri: Some(format!("http://example.com/{name}")),
            name: LanguageString::with("en", name),
            description: LanguageString::new(),
        })
    }

    fn class_usage(id: &str, usage_of: &str) -> Entity {
        Entity::ClassUsage(ClassUsage {
            id: id.to_string(),
            usage_of: usage_of.to_string(),
            iri: None,
            name: None,
            description: None,
            usage_note: None,
        })
    }

    fn recorder(aggregator: &Aggregator) -> (Arc<Mutex<Vec<AggregatedChanges>>>, Subscription) {
        let batches = Arc::new(Mutex::new(Vec::new()));
        let sink = Arc::clone(&batches);
        let subscription = aggregator.subscribe_to_changes(Arc::new(move |changes: &AggregatedChanges| {
            sink.lock().push(changes.clone());
        }));
        (batches, subscription)
    }

    #[test]
    fn test_add_model_aggregates_entities() {
        let aggregator = Aggregator::new();
        let (batches, _subscription) = recorder(&aggregator);
        let model = Arc::new(InMemorySemanticModel::with_entities(
            "local",
            vec![class("c1", "Person")],
        ));

        aggregator.add_model(model).unwrap();

        let entity = aggregator.entity("c1").unwrap();
        assert_eq!(entity.model, "local");
        assert_eq!(entity.aggregated_entity, Some(class("c1", "Person")));
        assert_eq!(batches.lock().len(), 1);
    }

    #[test]
    fn test_duplicate_id_rejects_model() {
        let aggregator = Aggregator::new();
        aggregator
            .add_model(Arc::new(InMemorySemanticModel::with_entities("a", vec![class("c1", "A")])))
            .unwrap();

        let second = Arc::new(InMemorySemanticModel::with_entities("b", vec![class("c1", "B")]));
        let result = aggregator.add_model(second.clone());
        assert_eq!(
            result,
            Err(ModelError::DuplicateEntityId {
                id: "c1".to_string(),
                existing_model: "a".to_string(),
            })
        );
        assert!(aggregator.model("b").is_none());

        // The rejected model is not listened to
        second
            .execute_operation(Operation::create_class("c2", None, LanguageString::with("en", "C2")))
            .unwrap();
        assert!(aggregator.entity("c2").is_none());
    }

    #[test]
    fn test_conflicting_change_keeps_first_owner_until_released() {
        let aggregator = Aggregator::new();
        let first = Arc::new(InMemorySemanticModel::with_entities("a", vec![class("c1", "A")]));
        let second = Arc::new(InMemorySemanticModel::new("b"));
        aggregator.add_model(first.clone()).unwrap();
        aggregator.add_model(second.clone()).unwrap();

        second
            .execute_operation(Operation::create_class("c1", Some("http://b/C1"), LanguageString::with("en", "B")))
            .unwrap();
        assert_eq!(aggregator.owner_of("c1").as_deref(), Some("a"));
        assert_eq!(aggregator.conflicts().len(), 1);

        first.execute_operation(Operation::delete("c1")).unwrap();
        assert_eq!(aggregator.owner_of("c1").as_deref(), Some("b"));
        assert!(aggregator.conflicts().is_empty());
        assert_eq!(
            aggregator.entity("c1").unwrap().raw_entity.label("en"),
            "B"
        );
    }

    #[test]
    fn test_class_profile_inherits_and_follows_base() {
        let aggregator = Aggregator::new();
        let vocabulary = Arc::new(InMemorySemanticModel::with_entities(
            "vocabulary",
            vec![class("c1", "Person")],
        ));
        let profiles = Arc::new(InMemorySemanticModel::with_entities(
            "profiles",
            vec![class_usage("p1", "c1")],
        ));
        aggregator.add_model(vocabulary.clone()).unwrap();
        aggregator.add_model(profiles).unwrap();

        let profile = aggregator.entity("p1").unwrap();
        assert_eq!(profile.entity().label("en"), "Person");
        assert_eq!(profile.entity().iri(), Some("http://example.com/Person"));

        let (batches, _subscription) = recorder(&aggregator);
        vocabulary
            .execute_operation(Operation::ModifyClass {
                id: "c1".to_string(),
                iri: None,
                name: Some(LanguageString::with("en", "Human")),
                description: None,
            })
            .unwrap();

        assert_eq!(aggregator.entity("p1").unwrap().entity().label("en"), "Human");
        let batches = batches.lock();
        assert_eq!(batches.len(), 1);
        let updated: Vec<&str> = batches[0].updated.iter().map(|e| e.id.as_str()).collect();
        assert_eq!(updated, vec!["c1", "p1"]);
    }

    #[test]
    fn test_unresolvable_profiles() {
        let aggregator = Aggregator::new();
        let relationship = Entity::Relationship(Relationship {
            id: "r1".to_string(),
            iri: None,
            name: LanguageString::new(),
            description: LanguageString::new(),
            ends: [
                RelationshipEnd::source("c1"),
                RelationshipEnd::target("c1", "http://example.com/knows"),
            ],
        });
        aggregator
            .add_model(Arc::new(InMemorySemanticModel::with_entities(
                "local",
                vec![
                    relationship,
                    class_usage("missing", "nowhere"),
                    class_usage("wrong-kind", "r1"),
                    class_usage("loop-a", "loop-b"),
                    class_usage("loop-b", "loop-a"),
                ],
            )))
            .unwrap();

        for id in ["missing", "wrong-kind", "loop-a", "loop-b"] {
            let entity = aggregator.entity(id).unwrap();
            assert!(!entity.is_resolved(), "{id} should not resolve");
        }
    }

    #[test]
    fn test_relationship_profile_inherits_ends() {
        let aggregator = Aggregator::new();
        let relationship = Entity::Relationship(Relationship {
            id: "r1".to_string(),
            iri: None,
            name: LanguageString::new(),
            description: LanguageString::new(),
            ends: [
                RelationshipEnd::source("c1"),
                RelationshipEnd::target("c2", "http://example.com/owns")
                    .with_cardinality(Cardinality::MANY),
            ],
        });
        let profile = Entity::RelationshipUsage(RelationshipUsage {
            id: "rp1".to_string(),
            usage_of: "r1".to_string(),
            iri: None,
            name: None,
            description: None,
            usage_note: None,
            ends: [
                RelationshipEnd::default(),
                RelationshipEnd {
                    cardinality: Some(Cardinality::ONE),
                    ..RelationshipEnd::default()
                },
            ],
        });
        aggregator
            .add_model(Arc::new(InMemorySemanticModel::with_entities(
                "local",
                vec![relationship, profile],
            )))
            .unwrap();

        let aggregated = aggregator.entity("rp1").unwrap();
        let ends = aggregated.entity().ends().unwrap();
        assert_eq!(ends[0].concept.as_deref(), Some("c1"));
        assert_eq!(ends[1].concept.as_deref(), Some("c2"));
        assert_eq!(ends[1].iri.as_deref(), Some("http://example.com/owns"));
        assert_eq!(ends[1].cardinality, Some(Cardinality::ONE));
    }

    #[test]
    fn test_delete_model_removes_entities() {
        let aggregator = Aggregator::new();
        aggregator
            .add_model(Arc::new(InMemorySemanticModel::with_entities(
                "local",
                vec![class("c1", "A"), class("c2", "B")],
            )))
            .unwrap();
        let (batches, _subscription) = recorder(&aggregator);

        aggregator.delete_model("local").unwrap();

        assert!(aggregator.entities().is_empty());
        assert_eq!(batches.lock()[0].removed, vec!["c1".to_string(), "c2".to_string()]);
        assert_eq!(
            aggregator.delete_model("local"),
            Err(ModelError::UnknownModel("local".to_string()))
        );
    }
}

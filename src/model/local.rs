//! Editable in-memory semantic model

use super::{EntityModel, ModelSnapshot};
use crate::commands::{Operation, OperationResult};
use crate::error::{ModelError, ModelResult};
use crate::events::{EntityModelChanges, EntityModelListener, ListenerRegistry, Subscription};
use crate::semantic::{
    Class, ClassUsage, Entity, EntityKind, Generalization, Relationship, RelationshipUsage,
};
use indexmap::{IndexMap, IndexSet};
use parking_lot::RwLock;
use petgraph::graphmap::DiGraphMap;
use std::sync::Arc;

/// Editable semantic model
///
/// Operations are validated against a staged copy of the entity map, which
/// replaces the live map only when the whole batch succeeded.
pub struct InMemorySemanticModel {
    id: String,
    alias: RwLock<Option<String>>,
    entities: RwLock<IndexMap<String, Entity>>,
    listeners: ListenerRegistry<EntityModelListener>,
}

impl InMemorySemanticModel {
    /// Create an empty model
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            alias: RwLock::new(None),
            entities: RwLock::new(IndexMap::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Create a model pre-populated with entities, without notifying anyone
    pub fn with_entities(id: impl Into<String>, entities: impl IntoIterator<Item = Entity>) -> Self {
        let model = Self::new(id);
        {
            let mut map = model.entities.write();
            for entity in entities {
                map.insert(entity.id().to_string(), entity);
            }
        }
        model
    }

    pub fn len(&self) -> usize {
        self.entities.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl EntityModel for InMemorySemanticModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn alias(&self) -> Option<String> {
        self.alias.read().clone()
    }

    fn set_alias(&self, alias: Option<String>) {
        *self.alias.write() = alias;
    }

    fn entities(&self) -> IndexMap<String, Entity> {
        self.entities.read().clone()
    }

    fn entity(&self, id: &str) -> Option<Entity> {
        self.entities.read().get(id).cloned()
    }

    fn is_read_only(&self) -> bool {
        false
    }

    fn execute_operations(&self, operations: Vec<Operation>) -> ModelResult<Vec<OperationResult>> {
        let (changes, results) = {
            let mut entities = self.entities.write();
            let mut staged = entities.clone();
            let mut touched = IndexSet::new();
            let mut results = Vec::with_capacity(operations.len());

            for operation in operations {
                let name = operation.name();
                let result = apply_operation(&mut staged, operation).map_err(|error| {
                    tracing::warn!(model = %self.id, operation = name, %error, "Operation rejected");
                    error
                })?;
                if let Some(id) = &result.id {
                    touched.insert(id.clone());
                }
                results.push(result);
            }

            let mut changes = EntityModelChanges::default();
            for id in touched {
                match staged.get(&id) {
                    Some(entity) => changes.updated.push(entity.clone()),
                    None if entities.contains_key(&id) => changes.removed.push(id),
                    // Created and deleted within the same batch
                    None => {}
                }
            }
            *entities = staged;
            (changes, results)
        };

        if !changes.is_empty() {
            tracing::debug!(
                model = %self.id,
                updated = changes.updated.len(),
                removed = changes.removed.len(),
                "Entity model changed"
            );
            self.listeners.emit(|listener| listener(&changes));
        }
        Ok(results)
    }

    fn subscribe_to_changes(&self, listener: Arc<EntityModelListener>) -> Subscription {
        self.listeners.register(listener)
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::Local {
            id: self.id.clone(),
            alias: self.alias(),
            entities: self.entities.read().values().cloned().collect(),
        }
    }
}

fn rejected(message: impl Into<String>) -> ModelError {
    ModelError::OperationRejected(message.into())
}

fn new_id(requested: Option<String>, entities: &IndexMap<String, Entity>) -> ModelResult<String> {
    match requested {
        Some(id) if id.trim().is_empty() => Err(rejected("Entity id cannot be empty")),
        Some(id) if entities.contains_key(&id) => {
            Err(rejected(format!("Entity {id} already exists")))
        }
        Some(id) => Ok(id),
        None => Ok(uuid::Uuid::new_v4().to_string()),
    }
}

fn ensure_unique_iri(
    entities: &IndexMap<String, Entity>,
    iri: Option<&str>,
    owner: &str,
) -> ModelResult<()> {
    let Some(iri) = iri else {
        return Ok(());
    };
    match entities
        .values()
        .find(|entity| entity.id() != owner && entity.iri() == Some(iri))
    {
        Some(other) => Err(rejected(format!("IRI {iri} is already used by {}", other.id()))),
        None => Ok(()),
    }
}

fn existing<'a>(
    entities: &'a mut IndexMap<String, Entity>,
    id: &str,
    kind: EntityKind,
) -> ModelResult<&'a mut Entity> {
    match entities.get_mut(id) {
        Some(entity) if entity.kind() == kind => Ok(entity),
        Some(entity) => Err(rejected(format!(
            "Entity {id} is a {}, not a {kind}",
            entity.kind()
        ))),
        None => Err(rejected(format!("Entity {id} does not exist"))),
    }
}

fn ensure_usage_target(usage_of: &str) -> ModelResult<()> {
    if usage_of.trim().is_empty() {
        return Err(rejected("Profile must reference the profiled entity"));
    }
    Ok(())
}

/// Reject generalizations that make the hierarchy cyclic
fn ensure_acyclic_hierarchy(entities: &IndexMap<String, Entity>) -> ModelResult<()> {
    let mut hierarchy = DiGraphMap::<&str, ()>::new();
    for entity in entities.values() {
        if let Entity::Generalization(generalization) = entity {
            hierarchy.add_edge(generalization.child.as_str(), generalization.parent.as_str(), ());
        }
    }
    if petgraph::algo::is_cyclic_directed(&hierarchy) {
        return Err(rejected("Generalization would create a cycle"));
    }
    Ok(())
}

fn apply_operation(
    entities: &mut IndexMap<String, Entity>,
    operation: Operation,
) -> ModelResult<OperationResult> {
    match operation {
        Operation::CreateClass {
            id,
            iri,
            name,
            description,
        } => {
            let id = new_id(id, entities)?;
            ensure_unique_iri(entities, iri.as_deref(), &id)?;
            entities.insert(
                id.clone(),
                Entity::Class(Class {
                    id: id.clone(),
                    iri,
                    name,
                    description,
                }),
            );
            Ok(OperationResult::with_id(id))
        }

        Operation::ModifyClass {
            id,
            iri,
            name,
            description,
        } => {
            if let Some(iri) = &iri {
                ensure_unique_iri(entities, iri.as_deref(), &id)?;
            }
            if let Entity::Class(class) = existing(entities, &id, EntityKind::Class)? {
                if let Some(iri) = iri {
                    class.iri = iri;
                }
                if let Some(name) = name {
                    class.name = name;
                }
                if let Some(description) = description {
                    class.description = description;
                }
            }
            Ok(OperationResult::with_id(id))
        }

        Operation::CreateRelationship {
            id,
            iri,
            name,
            description,
            ends,
        } => {
            let id = new_id(id, entities)?;
            ensure_unique_iri(entities, iri.as_deref(), &id)?;
            entities.insert(
                id.clone(),
                Entity::Relationship(Relationship {
                    id: id.clone(),
                    iri,
                    name,
                    description,
                    ends,
                }),
            );
            Ok(OperationResult::with_id(id))
        }

        Operation::ModifyRelationship {
            id,
            iri,
            name,
            description,
            ends,
        } => {
            if let Some(iri) = &iri {
                ensure_unique_iri(entities, iri.as_deref(), &id)?;
            }
            if let Entity::Relationship(relationship) =
                existing(entities, &id, EntityKind::Relationship)?
            {
                if let Some(iri) = iri {
                    relationship.iri = iri;
                }
                if let Some(name) = name {
                    relationship.name = name;
                }
                if let Some(description) = description {
                    relationship.description = description;
                }
                if let Some(ends) = ends {
                    relationship.ends = ends;
                }
            }
            Ok(OperationResult::with_id(id))
        }

        Operation::CreateGeneralization {
            id,
            iri,
            child,
            parent,
        } => {
            if child == parent {
                return Err(rejected(format!("{child} cannot generalize itself")));
            }
            let id = new_id(id, entities)?;
            ensure_unique_iri(entities, iri.as_deref(), &id)?;
            entities.insert(
                id.clone(),
                Entity::Generalization(Generalization {
                    id: id.clone(),
                    iri,
                    child,
                    parent,
                }),
            );
            ensure_acyclic_hierarchy(entities)?;
            Ok(OperationResult::with_id(id))
        }

        Operation::DeleteEntity { id } => {
            if entities.shift_remove(&id).is_none() {
                return Err(rejected(format!("Entity {id} does not exist")));
            }
            Ok(OperationResult::with_id(id))
        }

        Operation::CreateClassUsage {
            id,
            usage_of,
            iri,
            name,
            description,
            usage_note,
        } => {
            ensure_usage_target(&usage_of)?;
            let id = new_id(id, entities)?;
            ensure_unique_iri(entities, iri.as_deref(), &id)?;
            entities.insert(
                id.clone(),
                Entity::ClassUsage(ClassUsage {
                    id: id.clone(),
                    usage_of,
                    iri,
                    name,
                    description,
                    usage_note,
                }),
            );
            Ok(OperationResult::with_id(id))
        }

        Operation::ModifyClassUsage {
            id,
            iri,
            name,
            description,
            usage_note,
        } => {
            if let Some(iri) = &iri {
                ensure_unique_iri(entities, iri.as_deref(), &id)?;
            }
            if let Entity::ClassUsage(usage) = existing(entities, &id, EntityKind::ClassUsage)? {
                if let Some(iri) = iri {
                    usage.iri = iri;
                }
                if let Some(name) = name {
                    usage.name = name;
                }
                if let Some(description) = description {
                    usage.description = description;
                }
                if let Some(usage_note) = usage_note {
                    usage.usage_note = usage_note;
                }
            }
            Ok(OperationResult::with_id(id))
        }

        Operation::CreateRelationshipUsage {
            id,
            usage_of,
            iri,
            name,
            description,
            usage_note,
            ends,
        } => {
            ensure_usage_target(&usage_of)?;
            let id = new_id(id, entities)?;
            ensure_unique_iri(entities, iri.as_deref(), &id)?;
            entities.insert(
                id.clone(),
                Entity::RelationshipUsage(RelationshipUsage {
                    id: id.clone(),
                    usage_of,
                    iri,
                    name,
                    description,
                    usage_note,
                    ends,
                }),
            );
            Ok(OperationResult::with_id(id))
        }

        Operation::ModifyRelationshipUsage {
            id,
            iri,
            name,
            description,
            usage_note,
            ends,
        } => {
            if let Some(iri) = &iri {
                ensure_unique_iri(entities, iri.as_deref(), &id)?;
            }
            if let Entity::RelationshipUsage(usage) =
                existing(entities, &id, EntityKind::RelationshipUsage)?
            {
                if let Some(iri) = iri {
                    usage.iri = iri;
                }
                if let Some(name) = name {
                    usage.name = name;
                }
                if let Some(description) = description {
                    usage.description = description;
                }
                if let Some(usage_note) = usage_note {
                    usage.usage_note = usage_note;
                }
                if let Some(ends) = ends {
                    usage.ends = ends;
                }
            }
            Ok(OperationResult::with_id(id))
        }
    }
}

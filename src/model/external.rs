//! Read-only model backed by an external vocabulary
//!
//! Nothing is cached until a class is allowed. Allowing a class fetches it,
//! allowing its surroundings fetches the relationships and generalizations
//! around it together with the classes on their other ends. An entity stays
//! cached while at least one allowance still contributes it.

use super::{EntityModel, ModelSnapshot};
use crate::commands::{Operation, OperationResult};
use crate::error::{ModelError, ModelResult};
use crate::events::{EntityModelChanges, EntityModelListener, ListenerRegistry, Subscription};
use crate::semantic::Entity;
use async_trait::async_trait;
use indexmap::{IndexMap, IndexSet};
use parking_lot::{Mutex, RwLock};
use std::collections::HashMap;
use std::sync::Arc;

/// Remote vocabulary the external model fetches from
#[async_trait]
pub trait ExternalSource: Send + Sync {
    /// Fetch a class; an unknown class yields no entities
    async fn fetch_class(&self, class_id: &str) -> ModelResult<Vec<Entity>>;

    /// Fetch everything directly connected to a class
    async fn fetch_class_surroundings(&self, class_id: &str) -> ModelResult<Vec<Entity>>;
}

/// Vocabulary held in memory, used for tests and bundled vocabularies
pub struct InMemoryExternalSource {
    entities: IndexMap<String, Entity>,
}

impl InMemoryExternalSource {
    pub fn new(entities: impl IntoIterator<Item = Entity>) -> Self {
        Self {
            entities: entities
                .into_iter()
                .map(|entity| (entity.id().to_string(), entity))
                .collect(),
        }
    }
}

#[async_trait]
impl ExternalSource for InMemoryExternalSource {
    async fn fetch_class(&self, class_id: &str) -> ModelResult<Vec<Entity>> {
        Ok(self
            .entities
            .get(class_id)
            .filter(|entity| entity.is_class_like())
            .cloned()
            .into_iter()
            .collect())
    }

    async fn fetch_class_surroundings(&self, class_id: &str) -> ModelResult<Vec<Entity>> {
        let mut surroundings: IndexMap<String, Entity> = IndexMap::new();
        for entity in self.entities.values() {
            if entity.is_class_like() {
                continue;
            }
            let references = entity.references();
            if !references.contains(&class_id) {
                continue;
            }
            surroundings.insert(entity.id().to_string(), entity.clone());
            for neighbour in references {
                if let Some(class) = self.entities.get(neighbour).filter(|e| e.is_class_like()) {
                    surroundings.insert(neighbour.to_string(), class.clone());
                }
            }
        }
        Ok(surroundings.into_values().collect())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum Allowance {
    Class(String),
    Surroundings(String),
}

#[derive(Default)]
struct ExternalState {
    entities: IndexMap<String, Entity>,
    allowances: IndexMap<Allowance, IndexSet<String>>,
}

impl ExternalState {
    fn allow(&mut self, allowance: Allowance, fetched: Vec<Entity>) -> EntityModelChanges {
        let mut changes = EntityModelChanges::default();
        let mut contributed = IndexSet::new();
        for entity in fetched {
            let id = entity.id().to_string();
            contributed.insert(id.clone());
            if self.entities.get(&id) != Some(&entity) {
                self.entities.insert(id, entity.clone());
                changes.updated.push(entity);
            }
        }
        self.allowances.insert(allowance, contributed);
        changes
    }

    fn release(&mut self, allowance: &Allowance) -> EntityModelChanges {
        let mut changes = EntityModelChanges::default();
        let Some(contributed) = self.allowances.shift_remove(allowance) else {
            return changes;
        };
        for id in contributed {
            let still_needed = self.allowances.values().any(|ids| ids.contains(&id));
            if !still_needed && self.entities.shift_remove(&id).is_some() {
                changes.removed.push(id);
            }
        }
        changes
    }
}

/// Read-only semantic model mirroring an [`ExternalSource`]
pub struct ExternalSemanticModel {
    id: String,
    alias: RwLock<Option<String>>,
    source: Arc<dyn ExternalSource>,
    state: RwLock<ExternalState>,
    class_locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
    listeners: ListenerRegistry<EntityModelListener>,
}

impl ExternalSemanticModel {
    pub fn new(id: impl Into<String>, source: Arc<dyn ExternalSource>) -> Self {
        Self {
            id: id.into(),
            alias: RwLock::new(None),
            source,
            state: RwLock::new(ExternalState::default()),
            class_locks: Mutex::new(HashMap::new()),
            listeners: ListenerRegistry::new(),
        }
    }

    /// Fetch and cache a class. Allowing an allowed class is a no-op.
    pub async fn allow_class(&self, class_id: &str) -> ModelResult<()> {
        self.allow(Allowance::Class(class_id.to_string()), class_id).await
    }

    /// Drop a class from the cache unless another allowance still needs it
    pub async fn release_class(&self, class_id: &str) -> ModelResult<()> {
        self.release(Allowance::Class(class_id.to_string()), class_id).await
    }

    /// Fetch and cache everything around a class
    pub async fn allow_class_surroundings(&self, class_id: &str) -> ModelResult<()> {
        self.allow(Allowance::Surroundings(class_id.to_string()), class_id)
            .await
    }

    pub async fn release_class_surroundings(&self, class_id: &str) -> ModelResult<()> {
        self.release(Allowance::Surroundings(class_id.to_string()), class_id)
            .await
    }

    /// Classes allowed so far, in allowance order
    pub fn allowed_classes(&self) -> Vec<String> {
        self.allowed(|allowance| match allowance {
            Allowance::Class(id) => Some(id),
            Allowance::Surroundings(_) => None,
        })
    }

    /// Classes whose surroundings are allowed
    pub fn allowed_surroundings(&self) -> Vec<String> {
        self.allowed(|allowance| match allowance {
            Allowance::Surroundings(id) => Some(id),
            Allowance::Class(_) => None,
        })
    }

    fn allowed(&self, select: impl Fn(&Allowance) -> Option<&String>) -> Vec<String> {
        self.state
            .read()
            .allowances
            .keys()
            .filter_map(|allowance| select(allowance).cloned())
            .collect()
    }

    /// Per class lock serializing allow/release calls for the same class
    fn class_lock(&self, class_id: &str) -> Arc<tokio::sync::Mutex<()>> {
        Arc::clone(
            self.class_locks
                .lock()
                .entry(class_id.to_string())
                .or_default(),
        )
    }

    /// Run `work` while holding the class lock, dropping the lock entry
    /// afterwards when no other call is waiting on it
    async fn serialized<F>(&self, class_id: &str, work: F) -> ModelResult<()>
    where
        F: std::future::Future<Output = ModelResult<()>>,
    {
        let lock = self.class_lock(class_id);
        let result = {
            let _guard = lock.lock().await;
            work.await
        };

        let mut locks = self.class_locks.lock();
        // One reference in the map, one held here
        if Arc::strong_count(&lock) == 2 {
            locks.remove(class_id);
        }
        result
    }

    async fn allow(&self, allowance: Allowance, class_id: &str) -> ModelResult<()> {
        self.serialized(class_id, async {
            if self.state.read().allowances.contains_key(&allowance) {
                return Ok(());
            }

            let fetched = match &allowance {
                Allowance::Class(_) => self.source.fetch_class(class_id).await,
                Allowance::Surroundings(_) => self.source.fetch_class_surroundings(class_id).await,
            }
            .map_err(|error| {
                tracing::warn!(model = %self.id, class = class_id, %error, "External fetch failed");
                error
            })?;

            let changes = self.state.write().allow(allowance.clone(), fetched);
            tracing::debug!(model = %self.id, class = class_id, updated = changes.updated.len(), "Allowed");
            self.notify(changes);
            Ok(())
        })
        .await
    }

    async fn release(&self, allowance: Allowance, class_id: &str) -> ModelResult<()> {
        self.serialized(class_id, async {
            let changes = self.state.write().release(&allowance);
            tracing::debug!(model = %self.id, class = class_id, removed = changes.removed.len(), "Released");
            self.notify(changes);
            Ok(())
        })
        .await
    }

    fn notify(&self, changes: EntityModelChanges) {
        if !changes.is_empty() {
            self.listeners.emit(|listener| listener(&changes));
        }
    }
}

impl EntityModel for ExternalSemanticModel {
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
        self.state.read().entities.clone()
    }

    fn entity(&self, id: &str) -> Option<Entity> {
        self.state.read().entities.get(id).cloned()
    }

    fn is_read_only(&self) -> bool {
        true
    }

    fn execute_operations(&self, operations: Vec<Operation>) -> ModelResult<Vec<OperationResult>> {
        tracing::warn!(model = %self.id, count = operations.len(), "Operations on read-only model");
        Err(ModelError::NotSupported(self.id.clone()))
    }

    fn subscribe_to_changes(&self, listener: Arc<EntityModelListener>) -> Subscription {
        self.listeners.register(listener)
    }

    fn snapshot(&self) -> ModelSnapshot {
        ModelSnapshot::External {
            id: self.id.clone(),
            alias: self.alias(),
            allowed_classes: self.allowed_classes(),
            allowed_surroundings: self.allowed_surroundings(),
        }
    }
}

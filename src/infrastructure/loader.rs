//! Turning persisted model snapshots back into live models

use crate::error::{ModelError, ModelResult};
use crate::model::{
    EntityModel, ExternalSemanticModel, ExternalSource, InMemorySemanticModel, ModelSnapshot,
};
use crate::visual::{InMemoryVisualModel, ReadOnlyVisualModel, VisualModel};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;

/// Models restored from a package
#[derive(Default)]
pub struct LoadedModels {
    pub semantic: Vec<Arc<dyn EntityModel>>,
    pub visual: Vec<Arc<dyn VisualModel>>,
}

impl LoadedModels {
    /// Check that the models can all be registered together
    ///
    /// Model ids must be unique per kind and no entity id may be owned by
    /// two semantic models.
    pub fn validate(&self) -> ModelResult<()> {
        let mut models = HashSet::new();
        let mut owners: HashMap<String, String> = HashMap::new();
        for model in &self.semantic {
            if !models.insert(model.id()) {
                return Err(ModelError::OperationRejected(format!(
                    "Model {} appears twice in the package",
                    model.id()
                )));
            }
            for id in model.entities().into_keys() {
                if let Some(existing) = owners.get(&id) {
                    return Err(ModelError::DuplicateEntityId {
                        id,
                        existing_model: existing.clone(),
                    });
                }
                owners.insert(id, model.id().to_string());
            }
        }

        let mut visual = HashSet::new();
        for model in &self.visual {
            if !visual.insert(model.id()) {
                return Err(ModelError::OperationRejected(format!(
                    "Visual model {} appears twice in the package",
                    model.id()
                )));
            }
        }
        Ok(())
    }
}

/// Restores models from snapshots
///
/// External models are re-filled by allowing every class they had allowed,
/// which fetches them from the external source again.
pub struct PackageLoader {
    external_source: Arc<dyn ExternalSource>,
}

impl PackageLoader {
    pub fn new(external_source: Arc<dyn ExternalSource>) -> Self {
        Self { external_source }
    }

    pub async fn load(&self, snapshots: Vec<ModelSnapshot>) -> ModelResult<LoadedModels> {
        let mut loaded = LoadedModels::default();
        for snapshot in snapshots {
            match snapshot {
                ModelSnapshot::Local {
                    id,
                    alias,
                    entities,
                } => {
                    let model = InMemorySemanticModel::with_entities(id, entities);
                    model.set_alias(alias);
                    loaded.semantic.push(Arc::new(model));
                }
                ModelSnapshot::External {
                    id,
                    alias,
                    allowed_classes,
                    allowed_surroundings,
                } => {
                    let model = ExternalSemanticModel::new(id, Arc::clone(&self.external_source));
                    model.set_alias(alias);
                    for class in &allowed_classes {
                        model.allow_class(class).await?;
                    }
                    for class in &allowed_surroundings {
                        model.allow_class_surroundings(class).await?;
                    }
                    loaded.semantic.push(Arc::new(model));
                }
                ModelSnapshot::Visual {
                    id,
                    writable,
                    entities,
                    colors,
                } => {
                    let model: Arc<dyn VisualModel> = if writable {
                        Arc::new(InMemoryVisualModel::from_parts(id, entities, colors)?)
                    } else {
                        Arc::new(ReadOnlyVisualModel::from_parts(id, entities, colors)?)
                    };
                    loaded.visual.push(model);
                }
            }
        }
        tracing::debug!(
            semantic = loaded.semantic.len(),
            visual = loaded.visual.len(),
            "Models restored"
        );
        Ok(loaded)
    }
}

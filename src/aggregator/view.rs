//! Consumer handle on the aggregator

use super::{AggregatedEntity, Aggregator};
use crate::error::{ModelError, ModelResult};
use crate::events::{
    ActiveVisualModelListener, AggregatorListener, ListenerRegistry, Subscription,
    VisualModelRegistration,
};
use crate::model::EntityModel;
use crate::visual::VisualModel;
use indexmap::IndexMap;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

struct ViewInner {
    aggregator: Aggregator,
    active: RwLock<Option<String>>,
    active_listeners: ListenerRegistry<ActiveVisualModelListener>,
    registry_subscription: Mutex<Option<Subscription>>,
}

impl ViewInner {
    fn set_active(&self, model_id: Option<String>) {
        {
            let mut active = self.active.write();
            if *active == model_id {
                return;
            }
            *active = model_id.clone();
        }
        tracing::info!(model = ?model_id, "Active visual model changed");
        self.active_listeners
            .emit(|listener| listener(model_id.as_deref()));
    }
}

impl Drop for ViewInner {
    fn drop(&mut self) {
        if let Some(subscription) = self.registry_subscription.get_mut().take() {
            subscription.unsubscribe();
        }
    }
}

/// View of the aggregated entities with its own active visual model
///
/// Several views may share one aggregator. Clones share the active model.
#[derive(Clone)]
pub struct AggregatorView {
    inner: Arc<ViewInner>,
}

impl AggregatorView {
    pub fn new(aggregator: Aggregator) -> Self {
        let inner = Arc::new(ViewInner {
            aggregator: aggregator.clone(),
            active: RwLock::new(None),
            active_listeners: ListenerRegistry::new(),
            registry_subscription: Mutex::new(None),
        });

        // Drop the active model when it is unregistered
        let weak = Arc::downgrade(&inner);
        let subscription = aggregator.subscribe_to_visual_models(Arc::new(
            move |registration: &VisualModelRegistration| {
                let Some(inner) = weak.upgrade() else {
                    return;
                };
                if let VisualModelRegistration::Removed(model_id) = registration {
                    let is_active = inner.active.read().as_deref() == Some(model_id.as_str());
                    if is_active {
                        inner.set_active(None);
                    }
                }
            },
        ));
        *inner.registry_subscription.lock() = Some(subscription);

        Self { inner }
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.inner.aggregator
    }

    /// Currently active visual model, if any
    pub fn active_visual_model(&self) -> Option<Arc<dyn VisualModel>> {
        let model_id = self.inner.active.read().clone()?;
        self.inner.aggregator.visual_model(&model_id)
    }

    pub fn active_visual_model_id(&self) -> Option<String> {
        self.inner.active.read().clone()
    }

    /// Switch the active visual model; `None` deactivates
    ///
    /// No model is mutated. The new model is visible through
    /// [`active_visual_model`](Self::active_visual_model) before listeners run.
    pub fn change_active_visual_model(&self, model_id: Option<&str>) -> ModelResult<()> {
        if let Some(model_id) = model_id {
            if self.inner.aggregator.visual_model(model_id).is_none() {
                return Err(ModelError::UnknownVisualModel(model_id.to_string()));
            }
        }
        self.inner.set_active(model_id.map(str::to_string));
        Ok(())
    }

    pub fn entities(&self) -> IndexMap<String, AggregatedEntity> {
        self.inner.aggregator.entities()
    }

    pub fn entity(&self, id: &str) -> Option<AggregatedEntity> {
        self.inner.aggregator.entity(id)
    }

    pub fn subscribe_to_changes(&self, listener: Arc<AggregatorListener>) -> Subscription {
        self.inner.aggregator.subscribe_to_changes(listener)
    }

    pub fn subscribe_to_active_visual_model(
        &self,
        listener: Arc<ActiveVisualModelListener>,
    ) -> Subscription {
        self.inner.active_listeners.register(listener)
    }

    pub fn available_visual_models(&self) -> Vec<Arc<dyn VisualModel>> {
        self.inner.aggregator.visual_models()
    }

    pub fn semantic_models(&self) -> Vec<Arc<dyn EntityModel>> {
        self.inner.aggregator.models()
    }
}

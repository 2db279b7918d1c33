//! Editor context
//!
//! Owns the aggregator and wires the collaborators together. There is no
//! global state; everything that needs the aggregator receives it from here.

use crate::aggregator::{Aggregator, AggregatorView};
use crate::config::EditorConfig;
use crate::error::{ModelError, ModelResult};
use crate::infrastructure::{Autosaver, Package, PackageBackend, PackageLoader, SaveStatus};
use crate::model::ExternalSource;
use crate::sync::DiagramSynchronizer;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::info;

/// One open editor: a package, its models and their aggregation
pub struct EditorContext {
    config: EditorConfig,
    aggregator: Aggregator,
    view: AggregatorView,
    backend: Arc<dyn PackageBackend>,
    loader: PackageLoader,
    package: Option<Package>,
    autosaver: Option<Arc<Autosaver>>,
    autosave_task: Option<JoinHandle<()>>,
}

impl EditorContext {
    pub fn new(
        config: EditorConfig,
        backend: Arc<dyn PackageBackend>,
        external_source: Arc<dyn ExternalSource>,
    ) -> Self {
        let aggregator = Aggregator::new();
        let view = aggregator.view();
        Self {
            config,
            aggregator,
            view,
            backend,
            loader: PackageLoader::new(external_source),
            package: None,
            autosaver: None,
            autosave_task: None,
        }
    }

    pub fn config(&self) -> &EditorConfig {
        &self.config
    }

    pub fn aggregator(&self) -> &Aggregator {
        &self.aggregator
    }

    /// The editor's own view of the aggregator
    pub fn view(&self) -> &AggregatorView {
        &self.view
    }

    pub fn package(&self) -> Option<&Package> {
        self.package.as_ref()
    }

    /// Open a package, replacing every registered model with its models
    ///
    /// The first visual model of the package becomes active.
    pub async fn load_package(&mut self, iri: &str) -> ModelResult<Package> {
        let package = self.backend.get_package(iri).await?;
        let snapshots = self.backend.load_package_models(iri).await?;
        let loaded = self.loader.load(snapshots).await?;
        // Nothing is torn down unless every model can be registered
        loaded.validate()?;

        self.stop_autosave();
        self.view.change_active_visual_model(None)?;
        for model in self.aggregator.visual_models() {
            self.aggregator.delete_visual_model(model.id())?;
        }
        for model in self.aggregator.models() {
            self.aggregator.delete_model(model.id())?;
        }

        for model in loaded.semantic {
            self.aggregator.add_model(model)?;
        }
        let first_visual = loaded.visual.first().map(|model| model.id().to_string());
        for model in loaded.visual {
            self.aggregator.add_visual_model(model)?;
        }
        self.view
            .change_active_visual_model(first_visual.as_deref())?;

        info!(
            package = %package.iri,
            models = self.aggregator.models().len(),
            visual_models = self.aggregator.visual_models().len(),
            "Package loaded"
        );
        self.autosaver = Some(Arc::new(Autosaver::new(
            self.aggregator.clone(),
            Arc::clone(&self.backend),
            package.iri.clone(),
        )));
        self.package = Some(package.clone());
        Ok(package)
    }

    /// Store all models into the open package
    pub async fn save(&self) -> ModelResult<()> {
        let autosaver = self
            .autosaver
            .as_ref()
            .ok_or_else(|| ModelError::UnknownPackage("no package is open".to_string()))?;
        autosaver.save_now().await
    }

    pub fn save_status(&self) -> Option<SaveStatus> {
        self.autosaver.as_ref().map(|autosaver| autosaver.status())
    }

    /// Start saving periodically; returns whether autosave is running
    ///
    /// Must be called from within a tokio runtime.
    pub fn start_autosave(&mut self) -> bool {
        self.stop_autosave();
        let (Some(autosaver), Some(interval)) = (&self.autosaver, self.config.autosave_interval())
        else {
            return false;
        };
        info!(package = autosaver.package_iri(), ?interval, "Autosave started");
        self.autosave_task = Some(Arc::clone(autosaver).spawn(interval));
        true
    }

    pub fn stop_autosave(&mut self) {
        if let Some(task) = self.autosave_task.take() {
            task.abort();
        }
    }

    /// New synchronizer following the editor's view
    pub fn synchronizer(&self) -> DiagramSynchronizer {
        DiagramSynchronizer::new(self.view.clone(), self.config.sync_settings())
    }
}

impl Drop for EditorContext {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::{InMemoryPackageBackend, PackageDocument};
    use crate::model::{InMemoryExternalSource, ModelSnapshot};
    use crate::semantic::{Class, Entity};
    use crate::value_objects::LanguageString;
    use indexmap::IndexMap;

    fn context() -> (EditorContext, Arc<InMemoryPackageBackend>) {
        let backend = Arc::new(InMemoryPackageBackend::new("http://localhost/packages/"));
        backend.insert_document(PackageDocument {
            iri: "urn:package".to_string(),
            name: LanguageString::with("en", "Package"),
            models: vec![
                ModelSnapshot::Local {
                    id: "local".to_string(),
                    alias: None,
                    entities: Vec::new(),
                },
                ModelSnapshot::Visual {
                    id: "view".to_string(),
                    writable: true,
                    entities: Vec::new(),
                    colors: IndexMap::new(),
                },
            ],
        });
        let context = EditorContext::new(
            EditorConfig::default(),
            backend.clone(),
            Arc::new(InMemoryExternalSource::new(Vec::new())),
        );
        (context, backend)
    }

    #[tokio::test]
    async fn test_load_package_registers_models() {
        let (mut context, _backend) = context();
        context.load_package("urn:package").await.unwrap();

        assert_eq!(context.aggregator().models().len(), 1);
        assert_eq!(context.view().active_visual_model_id().as_deref(), Some("view"));

        // Loading again replaces rather than duplicates
        context.load_package("urn:package").await.unwrap();
        assert_eq!(context.aggregator().models().len(), 1);
    }

    #[tokio::test]
    async fn test_save_requires_open_package() {
        let (mut context, backend) = context();
        assert!(matches!(
            context.save().await,
            Err(ModelError::UnknownPackage(_))
        ));

        context.load_package("urn:package").await.unwrap();
        context.save().await.unwrap();
        assert!(matches!(context.save_status(), Some(SaveStatus::Saved { .. })));

        backend.set_available(false);
        assert!(matches!(
            context.save().await,
            Err(ModelError::BackendUnavailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_autosave_runs_after_load() {
        let (mut context, _backend) = context();
        assert!(!context.start_autosave());

        context.config.autosave_interval_ms = 100;
        context.load_package("urn:package").await.unwrap();
        assert!(context.start_autosave());
        tokio::time::sleep(std::time::Duration::from_millis(150)).await;
        assert!(matches!(context.save_status(), Some(SaveStatus::Saved { .. })));

        context.stop_autosave();
        context.config.autosave_interval_ms = 0;
        assert!(!context.start_autosave());
    }

    #[tokio::test]
    async fn test_conflicting_package_keeps_open_one() {
        let (mut context, backend) = context();
        context.load_package("urn:package").await.unwrap();

        let class = |id: &str| {
            Entity::Class(Class {
                id: id.to_string(),
                iri: None,
                name: LanguageString::with("en", id),
                description: LanguageString::new(),
            })
        };
        backend.insert_document(PackageDocument {
            iri: "urn:conflicting".to_string(),
            name: LanguageString::with("en", "Conflicting"),
            models: vec![
                ModelSnapshot::Local {
                    id: "first".to_string(),
                    alias: None,
                    entities: vec![class("shared")],
                },
                ModelSnapshot::Local {
                    id: "second".to_string(),
                    alias: None,
                    entities: vec![class("shared")],
                },
            ],
        });

        let result = context.load_package("urn:conflicting").await;
        assert!(matches!(result, Err(ModelError::DuplicateEntityId { .. })));
        assert_eq!(context.package().unwrap().iri, "urn:package");
        assert_eq!(context.aggregator().models()[0].id(), "local");
        assert_eq!(context.view().active_visual_model_id().as_deref(), Some("view"));
    }

    #[tokio::test]
    async fn test_unavailable_backend_leaves_context_untouched() {
        let (mut context, backend) = context();
        backend.set_available(false);

        let result = context.load_package("urn:package").await;
        assert!(matches!(result, Err(ModelError::BackendUnavailable(_))));
        assert!(context.package().is_none());
        assert!(context.aggregator().models().is_empty());
    }
}

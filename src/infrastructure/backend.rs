//! Package persistence backend

use crate::error::{ModelError, ModelResult};
use crate::model::ModelSnapshot;
use crate::value_objects::LanguageString;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};

/// Metadata of a stored package
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Package {
    pub iri: String,
    #[serde(default)]
    pub name: LanguageString,
    /// Package this one is nested in
    #[serde(default)]
    pub parent: Option<String>,
    pub created: DateTime<Utc>,
    pub modified: DateTime<Utc>,
}

/// A package together with its models, as stored in a file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PackageDocument {
    pub iri: String,
    #[serde(default)]
    pub name: LanguageString,
    #[serde(default)]
    pub models: Vec<ModelSnapshot>,
}

/// Remote store of packages and their models
#[async_trait]
pub trait PackageBackend: Send + Sync {
    async fn get_package(&self, iri: &str) -> ModelResult<Package>;

    /// Models stored in a package, semantic models first
    async fn load_package_models(&self, iri: &str) -> ModelResult<Vec<ModelSnapshot>>;

    /// Replace the models of a package
    async fn update_package_models(&self, iri: &str, models: Vec<ModelSnapshot>) -> ModelResult<Package>;

    async fn create_package(&self, parent: Option<&str>, name: LanguageString) -> ModelResult<Package>;
}

struct StoredPackage {
    package: Package,
    models: Vec<ModelSnapshot>,
}

/// Backend keeping packages in memory
///
/// Can be switched unavailable to simulate an unreachable server.
pub struct InMemoryPackageBackend {
    root_url: String,
    packages: RwLock<IndexMap<String, StoredPackage>>,
    available: AtomicBool,
}

impl InMemoryPackageBackend {
    /// Create an empty backend; new package IRIs start with `root_url`
    pub fn new(root_url: impl Into<String>) -> Self {
        Self {
            root_url: root_url.into(),
            packages: RwLock::new(IndexMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Store a package document, replacing any package with the same IRI
    pub fn insert_document(&self, document: PackageDocument) -> Package {
        let now = Utc::now();
        let package = Package {
            iri: document.iri.clone(),
            name: document.name,
            parent: None,
            created: now,
            modified: now,
        };
        self.packages.write().insert(
            document.iri,
            StoredPackage {
                package: package.clone(),
                models: document.models,
            },
        );
        package
    }

    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    pub fn package_count(&self) -> usize {
        self.packages.read().len()
    }

    fn ensure_available(&self) -> ModelResult<()> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(ModelError::BackendUnavailable(self.root_url.clone()))
        }
    }
}

#[async_trait]
impl PackageBackend for InMemoryPackageBackend {
    async fn get_package(&self, iri: &str) -> ModelResult<Package> {
        self.ensure_available()?;
        self.packages
            .read()
            .get(iri)
            .map(|stored| stored.package.clone())
            .ok_or_else(|| ModelError::UnknownPackage(iri.to_string()))
    }

    async fn load_package_models(&self, iri: &str) -> ModelResult<Vec<ModelSnapshot>> {
        self.ensure_available()?;
        self.packages
            .read()
            .get(iri)
            .map(|stored| stored.models.clone())
            .ok_or_else(|| ModelError::UnknownPackage(iri.to_string()))
    }

    async fn update_package_models(&self, iri: &str, models: Vec<ModelSnapshot>) -> ModelResult<Package> {
        self.ensure_available()?;
        let mut packages = self.packages.write();
        let stored = packages
            .get_mut(iri)
            .ok_or_else(|| ModelError::UnknownPackage(iri.to_string()))?;
        stored.models = models;
        stored.package.modified = Utc::now();
        tracing::debug!(package = iri, models = stored.models.len(), "Package models stored");
        Ok(stored.package.clone())
    }

    async fn create_package(&self, parent: Option<&str>, name: LanguageString) -> ModelResult<Package> {
        self.ensure_available()?;
        let mut packages = self.packages.write();
        if let Some(parent) = parent {
            if !packages.contains_key(parent) {
                return Err(ModelError::UnknownPackage(parent.to_string()));
            }
        }
        let now = Utc::now();
        let package = Package {
            iri: format!("{}{}", self.root_url, uuid::Uuid::new_v4()),
            name,
            parent: parent.map(str::to_string),
            created: now,
            modified: now,
        };
        packages.insert(
            package.iri.clone(),
            StoredPackage {
                package: package.clone(),
                models: Vec::new(),
            },
        );
        tracing::info!(package = %package.iri, "Package created");
        Ok(package)
    }
}

//! Periodic saving of the open package

use super::backend::PackageBackend;
use crate::aggregator::Aggregator;
use crate::error::ModelResult;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

/// Outcome of the most recent save
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "kebab-case")]
pub enum SaveStatus {
    /// Nothing saved yet
    Idle,
    Saved { at: DateTime<Utc> },
    Failed { at: DateTime<Utc>, error: String },
}

/// Saves every registered model of an aggregator into a package
pub struct Autosaver {
    aggregator: Aggregator,
    backend: Arc<dyn PackageBackend>,
    package_iri: String,
    status: RwLock<SaveStatus>,
}

impl Autosaver {
    pub fn new(aggregator: Aggregator, backend: Arc<dyn PackageBackend>, package_iri: impl Into<String>) -> Self {
        Self {
            aggregator,
            backend,
            package_iri: package_iri.into(),
            status: RwLock::new(SaveStatus::Idle),
        }
    }

    pub fn status(&self) -> SaveStatus {
        self.status.read().clone()
    }

    pub fn package_iri(&self) -> &str {
        &self.package_iri
    }

    /// Snapshot all models and store them
    pub async fn save_now(&self) -> ModelResult<()> {
        let models = self.aggregator.snapshot();
        let count = models.len();
        match self
            .backend
            .update_package_models(&self.package_iri, models)
            .await
        {
            Ok(package) => {
                tracing::info!(package = %self.package_iri, models = count, "Package saved");
                *self.status.write() = SaveStatus::Saved {
                    at: package.modified,
                };
                Ok(())
            }
            Err(error) => {
                tracing::error!(package = %self.package_iri, %error, "Saving package failed");
                *self.status.write() = SaveStatus::Failed {
                    at: Utc::now(),
                    error: error.to_string(),
                };
                Err(error)
            }
        }
    }

    /// Save every `interval` until the returned task is aborted
    ///
    /// Failures are recorded in [`status`](Self::status) and retried on the
    /// next tick.
    pub fn spawn(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            // The first tick completes immediately
            ticker.tick().await;
            loop {
                ticker.tick().await;
                if self.save_now().await.is_err() {
                    tracing::debug!(package = %self.package_iri, "Retrying on next tick");
                }
            }
        })
    }
}

//! Infrastructure layer implementations
//!
//! Persistence of packages, restoration of models from snapshots and
//! periodic saving.

mod autosave;
mod backend;
mod loader;

pub use autosave::{Autosaver, SaveStatus};
pub use backend::{InMemoryPackageBackend, Package, PackageBackend, PackageDocument};
pub use loader::{LoadedModels, PackageLoader};

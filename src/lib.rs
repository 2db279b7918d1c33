//! Semantic-to-visual synchronization core of a conceptual model editor
//!
//! Entity models contribute classes, relationships, generalizations and
//! their profiles. The [`Aggregator`] merges them into one view, resolving
//! profiles against what they profile. Visual models record where entities
//! are drawn, and the [`DiagramSynchronizer`] keeps a diagram consistent with
//! both sides, writing user gestures back into the models.

pub mod aggregator;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod handlers;
pub mod infrastructure;
pub mod model;
pub mod projections;
pub mod resolver;
pub mod semantic;
pub mod sync;
pub mod value_objects;
pub mod visual;

pub use aggregator::{AggregatedEntity, Aggregator, AggregatorView, EntityConflict};
pub use commands::{Operation, OperationResult};
pub use config::{ConfigError, EditorConfig};
pub use context::EditorContext;
pub use error::{EditorError, ModelError, ModelResult};
pub use events::{
    AggregatedChanges, EntityModelChanges, Subscription, VisualEntityChange, VisualModelListener,
    VisualModelRegistration,
};
pub use handlers::{
    ConnectionContext, ConnectionDialog, ConnectionRequest, DiagramGesture, TracingNotifier,
    UserNotifier,
};
pub use infrastructure::{
    Autosaver, InMemoryPackageBackend, LoadedModels, Package, PackageBackend, PackageDocument,
    PackageLoader, SaveStatus,
};
pub use model::{
    EntityModel, ExternalSemanticModel, ExternalSource, InMemoryExternalSource,
    InMemorySemanticModel, ModelSnapshot,
};
pub use projections::{
    Diagram, DiagramAttribute, DiagramEdge, DiagramNode, DiagramProjection, DiagramSurface,
    EdgeData, EdgeKind, NodeData,
};
pub use resolver::{attribute_domain, is_attribute, is_datatype, resolve_domain_and_range, DomainAndRange};
pub use semantic::{
    Class, ClassUsage, Entity, EntityKind, Generalization, Relationship, RelationshipEnd,
    RelationshipUsage,
};
pub use sync::{DiagramSynchronizer, SyncEvent, SyncSettings, SyncState};
pub use value_objects::{Cardinality, Color, LanguageString, Position, Waypoint};
pub use visual::{
    InMemoryVisualModel, ReadOnlyVisualModel, VisualEntity, VisualEntityUpdate, VisualModel,
    VisualNode, VisualNodeSpec, VisualRelationship, VisualRelationshipSpec,
};

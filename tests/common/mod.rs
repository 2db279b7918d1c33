//! Shared fixture: a small model of people, addresses and employees

#![allow(dead_code)]

use conceptual_model_editor::{
    Aggregator, Cardinality, Class, ClassUsage, Entity, Generalization, InMemorySemanticModel,
    InMemoryVisualModel, LanguageString, ModelError, Position, Relationship, RelationshipEnd,
    UserNotifier, VisualModel, VisualNodeSpec, VisualRelationshipSpec,
};
use parking_lot::Mutex;
use std::sync::Arc;

pub const LOCAL: &str = "local";
pub const LAYOUT: &str = "layout";

pub fn class(id: &str, name: &str) -> Entity {
    Entity::Class(Class {
        id: id.to_string(),
        iri: Some(format!("http://example.com/{id}")),
        name: LanguageString::with("en", name),
        description: LanguageString::new(),
    })
}

pub fn relationship(id: &str, domain: &str, range: &str, name: &str) -> Entity {
    Entity::Relationship(Relationship {
        id: id.to_string(),
        iri: None,
        name: LanguageString::new(),
        description: LanguageString::new(),
        ends: [
            RelationshipEnd::source(domain),
            RelationshipEnd::target(range, format!("http://example.com/{id}"))
                .with_name(LanguageString::with("en", name))
                .with_cardinality(Cardinality::MANY),
        ],
    })
}

pub fn attribute(id: &str, domain: &str, datatype: &str) -> Entity {
    Entity::Relationship(Relationship {
        id: id.to_string(),
        iri: None,
        name: LanguageString::new(),
        description: LanguageString::new(),
        ends: [
            RelationshipEnd::source(domain),
            RelationshipEnd::target(datatype, format!("http://example.com/{id}"))
                .with_name(LanguageString::with("en", id))
                .with_cardinality(Cardinality::ONE),
        ],
    })
}

pub fn generalization(id: &str, child: &str, parent: &str) -> Entity {
    Entity::Generalization(Generalization {
        id: id.to_string(),
        iri: None,
        child: child.to_string(),
        parent: parent.to_string(),
    })
}

pub fn class_profile(id: &str, usage_of: &str) -> Entity {
    Entity::ClassUsage(ClassUsage {
        id: id.to_string(),
        usage_of: usage_of.to_string(),
        iri: None,
        name: None,
        description: None,
        usage_note: None,
    })
}

/// Everything a synchronization test needs
pub struct Fixture {
    pub aggregator: Aggregator,
    pub local: Arc<InMemorySemanticModel>,
    pub layout: Arc<InMemoryVisualModel>,
}

/// People live at addresses, employees are people, people have an age
///
/// The layout shows person, address and employee with the relationship and
/// the generalization between them. No visual model is active yet.
pub fn fixture() -> Fixture {
    let local = Arc::new(InMemorySemanticModel::with_entities(
        LOCAL,
        [
            class("person", "Person"),
            class("address", "Address"),
            class("employee", "Employee"),
            relationship("lives-at", "person", "address", "lives at"),
            attribute("age", "person", "xsd:integer"),
            generalization("employee-is-person", "employee", "person"),
        ],
    ));
    let layout = Arc::new(InMemoryVisualModel::new(LAYOUT));
    for (id, x, y) in [("person", 0.0, 0.0), ("address", 200.0, 0.0), ("employee", 0.0, 200.0)] {
        layout
            .add_visual_node(VisualNodeSpec::new(LOCAL, id, Position::new(x, y)))
            .unwrap();
    }
    for id in ["lives-at", "employee-is-person"] {
        layout
            .add_visual_relationship(VisualRelationshipSpec::new(LOCAL, id))
            .unwrap();
    }

    let aggregator = Aggregator::new();
    aggregator.add_model(local.clone()).unwrap();
    aggregator.add_visual_model(layout.clone()).unwrap();
    Fixture {
        aggregator,
        local,
        layout,
    }
}

/// Notifier remembering every reported error
#[derive(Default)]
pub struct RecordingNotifier {
    pub errors: Mutex<Vec<String>>,
}

impl UserNotifier for RecordingNotifier {
    fn notify_error(&self, error: &ModelError) {
        self.errors.lock().push(error.to_string());
    }
}

//! Entity model operations
//!
//! Operations represent intent to modify a semantic model. They are executed
//! by an [`EntityModel`](crate::model::EntityModel), which validates them and
//! applies them atomically.

use crate::semantic::RelationshipEnd;
use crate::value_objects::LanguageString;
use serde::{Deserialize, Serialize};

/// Operations accepted by editable entity models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", rename_all = "kebab-case")]
pub enum Operation {
    /// Create a class
    CreateClass {
        /// Identifier to use, generated when absent
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        iri: Option<String>,
        #[serde(default)]
        name: LanguageString,
        #[serde(default)]
        description: LanguageString,
    },

    /// Change fields of a class; absent fields are left untouched
    ModifyClass {
        id: String,
        #[serde(default)]
        iri: Option<Option<String>>,
        #[serde(default)]
        name: Option<LanguageString>,
        #[serde(default)]
        description: Option<LanguageString>,
    },

    /// Create a relationship between two concepts
    CreateRelationship {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        iri: Option<String>,
        #[serde(default)]
        name: LanguageString,
        #[serde(default)]
        description: LanguageString,
        ends: [RelationshipEnd; 2],
    },

    /// Change fields of a relationship
    ModifyRelationship {
        id: String,
        #[serde(default)]
        iri: Option<Option<String>>,
        #[serde(default)]
        name: Option<LanguageString>,
        #[serde(default)]
        description: Option<LanguageString>,
        /// Replaces both ends
        #[serde(default)]
        ends: Option<[RelationshipEnd; 2]>,
    },

    /// Declare `child` a specialization of `parent`
    CreateGeneralization {
        #[serde(default)]
        id: Option<String>,
        #[serde(default)]
        iri: Option<String>,
        child: String,
        parent: String,
    },

    /// Delete any entity
    DeleteEntity { id: String },

    /// Create a profile of a class
    CreateClassUsage {
        #[serde(default)]
        id: Option<String>,
        usage_of: String,
        #[serde(default)]
        iri: Option<String>,
        #[serde(default)]
        name: Option<LanguageString>,
        #[serde(default)]
        description: Option<LanguageString>,
        #[serde(default)]
        usage_note: Option<LanguageString>,
    },

    /// Change fields of a class profile
    ModifyClassUsage {
        id: String,
        #[serde(default)]
        iri: Option<Option<String>>,
        #[serde(default)]
        name: Option<Option<LanguageString>>,
        #[serde(default)]
        description: Option<Option<LanguageString>>,
        #[serde(default)]
        usage_note: Option<Option<LanguageString>>,
    },

    /// Create a profile of a relationship
    CreateRelationshipUsage {
        #[serde(default)]
        id: Option<String>,
        usage_of: String,
        #[serde(default)]
        iri: Option<String>,
        #[serde(default)]
        name: Option<LanguageString>,
        #[serde(default)]
        description: Option<LanguageString>,
        #[serde(default)]
        usage_note: Option<LanguageString>,
        #[serde(default)]
        ends: [RelationshipEnd; 2],
    },

    /// Change fields of a relationship profile
    ModifyRelationshipUsage {
        id: String,
        #[serde(default)]
        iri: Option<Option<String>>,
        #[serde(default)]
        name: Option<Option<LanguageString>>,
        #[serde(default)]
        description: Option<Option<LanguageString>>,
        #[serde(default)]
        usage_note: Option<Option<LanguageString>>,
        #[serde(default)]
        ends: Option<[RelationshipEnd; 2]>,
    },
}

impl Operation {
    /// Shorthand for creating a named class
    pub fn create_class(
        id: impl Into<String>,
        iri: Option<&str>,
        name: LanguageString,
    ) -> Self {
        Operation::CreateClass {
            id: Some(id.into()),
            iri: iri.map(str::to_string),
            name,
            description: LanguageString::new(),
        }
    }

    /// Shorthand for creating a relationship from `domain` to `range`
    pub fn create_relationship(
        domain: impl Into<String>,
        range: impl Into<String>,
        range_iri: impl Into<String>,
        name: LanguageString,
    ) -> Self {
        Operation::CreateRelationship {
            id: None,
            iri: None,
            name: LanguageString::new(),
            description: LanguageString::new(),
            ends: [
                RelationshipEnd::source(domain),
                RelationshipEnd::target(range, range_iri).with_name(name),
            ],
        }
    }

    pub fn delete(id: impl Into<String>) -> Self {
        Operation::DeleteEntity { id: id.into() }
    }

    /// Operation name as used in logs
    pub fn name(&self) -> &'static str {
        match self {
            Operation::CreateClass { .. } => "create-class",
            Operation::ModifyClass { .. } => "modify-class",
            Operation::CreateRelationship { .. } => "create-relationship",
            Operation::ModifyRelationship { .. } => "modify-relationship",
            Operation::CreateGeneralization { .. } => "create-generalization",
            Operation::DeleteEntity { .. } => "delete-entity",
            Operation::CreateClassUsage { .. } => "create-class-usage",
            Operation::ModifyClassUsage { .. } => "modify-class-usage",
            Operation::CreateRelationshipUsage { .. } => "create-relationship-usage",
            Operation::ModifyRelationshipUsage { .. } => "modify-relationship-usage",
        }
    }
}

/// Successful outcome of an operation
///
/// Failed operations are reported as `Err`; a returned result always means
/// the operation was applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationResult {
    /// Id of the created or affected entity
    pub id: Option<String>,
}

impl OperationResult {
    pub fn with_id(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_operation_serialization() {
        let operation = Operation::create_class(
            "c1",
            Some("http://example.com/Person"),
            LanguageString::with("en", "Person"),
        );

        let json = serde_json::to_value(&operation).unwrap();
        assert_eq!(json["operation"], "create-class");
        assert_eq!(json["id"], "c1");

        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(back, operation);
    }

    #[test]
    fn test_modify_defaults_to_untouched() {
        let json = serde_json::json!({ "operation": "modify-class", "id": "c1" });
        let operation: Operation = serde_json::from_value(json).unwrap();

        match operation {
            Operation::ModifyClass {
                id,
                iri,
                name,
                description,
            } => {
                assert_eq!(id, "c1");
                assert!(iri.is_none());
                assert!(name.is_none());
                assert!(description.is_none());
            }
            _ => panic!("Expected ModifyClass operation"),
        }
    }

    #[test]
    fn test_create_relationship_shorthand() {
        match Operation::create_relationship("c1", "c2", "r1", LanguageString::new()) {
            Operation::CreateRelationship { ends, .. } => {
                assert_eq!(ends[0].concept.as_deref(), Some("c1"));
                assert!(ends[0].iri.is_none());
                assert_eq!(ends[1].iri.as_deref(), Some("r1"));
            }
            other => panic!("Expected CreateRelationship, got {}", other.name()),
        }
    }
}

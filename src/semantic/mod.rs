//! Semantic entities
//!
//! Every item of a conceptual model is one variant of the closed [`Entity`]
//! sum type. Consumers match on it exhaustively, so adding a kind forces every
//! consumption site to decide how to handle it.

use crate::value_objects::{Cardinality, LanguageString};
use serde::{Deserialize, Serialize};

/// A class of the conceptual model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Class {
    pub id: String,
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub name: LanguageString,
    #[serde(default)]
    pub description: LanguageString,
}

/// One of the two ends of a relationship
///
/// In a relationship profile every field left empty is inherited from the
/// corresponding end of the profiled relationship.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RelationshipEnd {
    /// Class (or datatype) this end points at
    #[serde(default)]
    pub concept: Option<String>,
    #[serde(default)]
    pub cardinality: Option<Cardinality>,
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub name: LanguageString,
    #[serde(default)]
    pub description: LanguageString,
}

impl RelationshipEnd {
    /// End pointing at `concept` without an IRI (a domain end)
    pub fn source(concept: impl Into<String>) -> Self {
        Self {
            concept: Some(concept.into()),
            ..Self::default()
        }
    }

    /// End pointing at `concept` identified by `iri` (a range end)
    pub fn target(concept: impl Into<String>, iri: impl Into<String>) -> Self {
        Self {
            concept: Some(concept.into()),
            iri: Some(iri.into()),
            ..Self::default()
        }
    }

    pub fn with_cardinality(mut self, cardinality: Cardinality) -> Self {
        self.cardinality = Some(cardinality);
        self
    }

    pub fn with_name(mut self, name: LanguageString) -> Self {
        self.name = name;
        self
    }

    /// Fill every empty field from `base`
    pub(crate) fn inherit_from(&self, base: &RelationshipEnd) -> RelationshipEnd {
        RelationshipEnd {
            concept: self.concept.clone().or_else(|| base.concept.clone()),
            cardinality: self.cardinality.or(base.cardinality),
            iri: self.iri.clone().or_else(|| base.iri.clone()),
            name: non_empty_or(&self.name, &base.name),
            description: non_empty_or(&self.description, &base.description),
        }
    }
}

/// A binary relationship between two concepts
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Relationship {
    pub id: String,
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub name: LanguageString,
    #[serde(default)]
    pub description: LanguageString,
    pub ends: [RelationshipEnd; 2],
}

/// "child is-a parent"
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Generalization {
    pub id: String,
    #[serde(default)]
    pub iri: Option<String>,
    pub child: String,
    pub parent: String,
}

/// Profile of a class (or of another class profile)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassUsage {
    pub id: String,
    pub usage_of: String,
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub name: Option<LanguageString>,
    #[serde(default)]
    pub description: Option<LanguageString>,
    #[serde(default)]
    pub usage_note: Option<LanguageString>,
}

/// Profile of a relationship (or of another relationship profile)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipUsage {
    pub id: String,
    pub usage_of: String,
    #[serde(default)]
    pub iri: Option<String>,
    #[serde(default)]
    pub name: Option<LanguageString>,
    #[serde(default)]
    pub description: Option<LanguageString>,
    #[serde(default)]
    pub usage_note: Option<LanguageString>,
    #[serde(default)]
    pub ends: [RelationshipEnd; 2],
}

/// Discriminant of [`Entity`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum EntityKind {
    Class,
    Relationship,
    Generalization,
    ClassUsage,
    RelationshipUsage,
}

impl EntityKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Class => "class",
            EntityKind::Relationship => "relationship",
            EntityKind::Generalization => "generalization",
            EntityKind::ClassUsage => "class-usage",
            EntityKind::RelationshipUsage => "relationship-usage",
        }
    }
}

impl std::fmt::Display for EntityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A semantic entity contributed by an entity model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum Entity {
    Class(Class),
    Relationship(Relationship),
    Generalization(Generalization),
    ClassUsage(ClassUsage),
    RelationshipUsage(RelationshipUsage),
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Class(e) => &e.id,
            Entity::Relationship(e) => &e.id,
            Entity::Generalization(e) => &e.id,
            Entity::ClassUsage(e) => &e.id,
            Entity::RelationshipUsage(e) => &e.id,
        }
    }

    pub fn kind(&self) -> EntityKind {
        match self {
            Entity::Class(_) => EntityKind::Class,
            Entity::Relationship(_) => EntityKind::Relationship,
            Entity::Generalization(_) => EntityKind::Generalization,
            Entity::ClassUsage(_) => EntityKind::ClassUsage,
            Entity::RelationshipUsage(_) => EntityKind::RelationshipUsage,
        }
    }

    pub fn iri(&self) -> Option<&str> {
        match self {
            Entity::Class(e) => e.iri.as_deref(),
            Entity::Relationship(e) => e.iri.as_deref(),
            Entity::Generalization(e) => e.iri.as_deref(),
            Entity::ClassUsage(e) => e.iri.as_deref(),
            Entity::RelationshipUsage(e) => e.iri.as_deref(),
        }
    }

    /// Entity this one profiles, if it is a profile
    pub fn usage_of(&self) -> Option<&str> {
        match self {
            Entity::ClassUsage(e) => Some(&e.usage_of),
            Entity::RelationshipUsage(e) => Some(&e.usage_of),
            Entity::Class(_) | Entity::Relationship(_) | Entity::Generalization(_) => None,
        }
    }

    /// Classes and class profiles are rendered as diagram nodes
    pub fn is_class_like(&self) -> bool {
        matches!(self, Entity::Class(_) | Entity::ClassUsage(_))
    }

    /// Relationship ends, for relationships and relationship profiles
    pub fn ends(&self) -> Option<&[RelationshipEnd; 2]> {
        match self {
            Entity::Relationship(e) => Some(&e.ends),
            Entity::RelationshipUsage(e) => Some(&e.ends),
            Entity::Class(_) | Entity::Generalization(_) | Entity::ClassUsage(_) => None,
        }
    }

    /// Name of the entity, empty when it has none
    pub fn name(&self) -> Option<&LanguageString> {
        match self {
            Entity::Class(e) => Some(&e.name),
            Entity::Relationship(e) => Some(&e.name),
            Entity::Generalization(_) => None,
            Entity::ClassUsage(e) => e.name.as_ref(),
            Entity::RelationshipUsage(e) => e.name.as_ref(),
        }
    }

    /// Human readable label: name, then IRI, then id
    pub fn label(&self, language: &str) -> String {
        if let Some(name) = self.name().and_then(|name| name.preferred(language)) {
            return name.to_string();
        }
        // Relationships are often named on their range end only
        if let Some(ends) = self.ends() {
            if let Some(name) = ends.iter().rev().find_map(|end| end.name.preferred(language)) {
                return name.to_string();
            }
        }
        self.iri().unwrap_or_else(|| self.id()).to_string()
    }

    /// Ids of other entities this entity points at
    pub fn references(&self) -> Vec<&str> {
        match self {
            Entity::Class(_) => Vec::new(),
            Entity::Relationship(e) => e
                .ends
                .iter()
                .filter_map(|end| end.concept.as_deref())
                .collect(),
            Entity::Generalization(e) => vec![e.child.as_str(), e.parent.as_str()],
            Entity::ClassUsage(e) => vec![e.usage_of.as_str()],
            Entity::RelationshipUsage(e) => std::iter::once(e.usage_of.as_str())
                .chain(e.ends.iter().filter_map(|end| end.concept.as_deref()))
                .collect(),
        }
    }
}

pub(crate) fn non_empty_or(value: &LanguageString, fallback: &LanguageString) -> LanguageString {
    if value.is_empty() {
        fallback.clone()
    } else {
        value.clone()
    }
}

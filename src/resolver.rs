//! Relationship end resolution
//!
//! Relationships do not store which end is the domain and which the range.
//! The roles are derived from IRI presence: the range end carries the IRI
//! the relationship is published under, the domain end has none.

use crate::semantic::{Entity, RelationshipEnd};

/// Domain and range of a relationship with distinguishable ends
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DomainAndRange<'a> {
    pub domain: &'a RelationshipEnd,
    pub domain_index: usize,
    pub range: &'a RelationshipEnd,
    pub range_index: usize,
}

/// Decide which end is the domain and which the range
///
/// Returns `None` when both or neither end has an IRI; such a relationship has
/// no distinguishable direction.
pub fn resolve_domain_and_range(ends: &[RelationshipEnd; 2]) -> Option<DomainAndRange<'_>> {
    let range_index = match (ends[0].iri.is_some(), ends[1].iri.is_some()) {
        (false, true) => 1,
        (true, false) => 0,
        (true, true) | (false, false) => return None,
    };
    let domain_index = 1 - range_index;
    Some(DomainAndRange {
        domain: &ends[domain_index],
        domain_index,
        range: &ends[range_index],
        range_index,
    })
}

const XSD_NAMESPACE: &str = "http://www.w3.org/2001/XMLSchema#";

const LITERAL_TYPES: &[&str] = &[
    "http://www.w3.org/2000/01/rdf-schema#Literal",
    "http://www.w3.org/1999/02/22-rdf-syntax-ns#langString",
    "rdfs:Literal",
    "rdf:langString",
];

/// Whether a concept reference denotes a datatype rather than a class
pub fn is_datatype(concept: &str) -> bool {
    concept.starts_with(XSD_NAMESPACE)
        || concept.starts_with("xsd:")
        || LITERAL_TYPES.contains(&concept)
}

/// Whether the entity is an attribute (or attribute profile)
///
/// An attribute is a directed relationship whose range has no class: the
/// range concept is missing or denotes a datatype.
pub fn is_attribute(entity: &Entity) -> bool {
    entity
        .ends()
        .and_then(resolve_domain_and_range)
        .map(|resolved| {
            resolved
                .range
                .concept
                .as_deref()
                .map_or(true, is_datatype)
        })
        .unwrap_or(false)
}

/// Class owning an attribute, `None` for non-attributes
pub fn attribute_domain(entity: &Entity) -> Option<&str> {
    if !is_attribute(entity) {
        return None;
    }
    entity
        .ends()
        .and_then(resolve_domain_and_range)
        .and_then(|resolved| resolved.domain.concept.as_deref())
}

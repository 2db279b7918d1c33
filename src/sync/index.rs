//! Local mirror of the aggregated entities with an attribute index

use crate::aggregator::AggregatedEntity;
use crate::resolver::attribute_domain;
use indexmap::{IndexMap, IndexSet};
use std::collections::HashMap;

/// Aggregated entities as last seen by the synchronizer
///
/// Updated only from queued change batches, so it never runs ahead of the
/// events the synchronizer has processed.
#[derive(Debug, Clone, Default)]
pub(crate) struct SemanticIndex {
    entities: IndexMap<String, AggregatedEntity>,
    /// Class id -> attributes whose domain is that class
    attributes: HashMap<String, IndexSet<String>>,
    attribute_domains: HashMap<String, String>,
}

impl SemanticIndex {
    pub(crate) fn from_entities(entities: IndexMap<String, AggregatedEntity>) -> Self {
        let mut index = Self::default();
        for entity in entities.into_values() {
            index.upsert(entity);
        }
        index
    }

    pub(crate) fn get(&self, id: &str) -> Option<&AggregatedEntity> {
        self.entities.get(id)
    }

    /// Store an entity, returning the class that owned it as an attribute before
    pub(crate) fn upsert(&mut self, entity: AggregatedEntity) -> Option<String> {
        let id = entity.id.clone();
        let previous_domain = self.unindex_attribute(&id);
        if let Some(domain) = attribute_domain(entity.entity()) {
            self.attributes
                .entry(domain.to_string())
                .or_default()
                .insert(id.clone());
            self.attribute_domains.insert(id.clone(), domain.to_string());
        }
        self.entities.insert(id, entity);
        previous_domain
    }

    /// Drop an entity, returning it with the class that owned it as an attribute
    pub(crate) fn remove(&mut self, id: &str) -> Option<(AggregatedEntity, Option<String>)> {
        let domain = self.unindex_attribute(id);
        self.entities
            .shift_remove(id)
            .map(|entity| (entity, domain))
    }

    /// Class currently owning an attribute
    pub(crate) fn attribute_domain(&self, id: &str) -> Option<&str> {
        self.attribute_domains.get(id).map(String::as_str)
    }

    /// Attributes of a class, in the order they were first seen
    pub(crate) fn attributes_of(&self, class_id: &str) -> Vec<&AggregatedEntity> {
        self.attributes
            .get(class_id)
            .map(|ids| ids.iter().filter_map(|id| self.entities.get(id)).collect())
            .unwrap_or_default()
    }

    /// Profiles whose profiled entity is `id`
    pub(crate) fn profiles_of(&self, id: &str) -> Vec<String> {
        self.entities
            .values()
            .filter(|entity| entity.raw_entity.usage_of() == Some(id))
            .map(|entity| entity.id.clone())
            .collect()
    }

    fn unindex_attribute(&mut self, id: &str) -> Option<String> {
        let domain = self.attribute_domains.remove(id)?;
        if let Some(ids) = self.attributes.get_mut(&domain) {
            ids.shift_remove(id);
            if ids.is_empty() {
                self.attributes.remove(&domain);
            }
        }
        Some(domain)
    }
}

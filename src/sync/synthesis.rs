//! Derivation of diagram items from visual and aggregated entities

use super::index::SemanticIndex;
use crate::projections::{
    DiagramAttribute, DiagramEdge, DiagramNode, DiagramProjection, EdgeData, EdgeKind, NodeData,
};
use crate::resolver::{is_attribute, resolve_domain_and_range};
use crate::semantic::Entity;
use crate::visual::{VisualNode, VisualRelationship};
use tracing::{debug, warn};

/// Inputs shared by every derivation of one pass
pub(crate) struct Synthesis<'a> {
    pub index: &'a SemanticIndex,
    pub language: &'a str,
}

impl Synthesis<'_> {
    /// Node for a visual node, `None` when its entity is unknown or not a class
    pub(crate) fn node(&self, visual: &VisualNode, color: String) -> Option<DiagramNode> {
        let Some(aggregated) = self.index.get(&visual.represented_entity) else {
            debug!(
                visual = %visual.identifier,
                represented = %visual.represented_entity,
                "Skipping visual node of unknown entity"
            );
            return None;
        };
        let entity = aggregated.entity();
        if !entity.is_class_like() {
            debug!(represented = %visual.represented_entity, kind = %entity.kind(), "Skipping visual node of non-class");
            return None;
        }

        let profile_of = entity.usage_of().map(|base| {
            self.index
                .get(base)
                .map(|base| base.entity().label(self.language))
                .unwrap_or_else(|| base.to_string())
        });

        Some(DiagramNode {
            id: aggregated.id.clone(),
            position: visual.position,
            data: NodeData {
                label: entity.label(self.language),
                iri: entity.iri().map(str::to_string),
                description: description(entity, self.language),
                color,
                attributes: self.attributes(&aggregated.id, &visual.content),
                profile_of,
                model: visual.model.clone(),
                visual_identifier: visual.identifier.clone(),
            },
        })
    }

    /// Attributes of a class; those listed in `content` first, in that order,
    /// then the rest by id
    fn attributes(&self, class_id: &str, content: &[String]) -> Vec<DiagramAttribute> {
        let mut attributes = self.index.attributes_of(class_id);
        attributes.sort_by(|left, right| {
            let rank = |id: &str| content.iter().position(|listed| listed == id).unwrap_or(usize::MAX);
            rank(&left.id)
                .cmp(&rank(&right.id))
                .then_with(|| left.id.cmp(&right.id))
        });

        attributes
            .into_iter()
            .map(|aggregated| {
                let entity = aggregated.entity();
                let range = entity
                    .ends()
                    .and_then(resolve_domain_and_range)
                    .map(|resolved| resolved.range);
                DiagramAttribute {
                    id: aggregated.id.clone(),
                    label: entity.label(self.language),
                    iri: range
                        .and_then(|end| end.iri.clone())
                        .or_else(|| entity.iri().map(str::to_string)),
                    datatype: range.and_then(|end| end.concept.clone()),
                    cardinality: range
                        .and_then(|end| end.cardinality)
                        .map(|cardinality| cardinality.to_string()),
                }
            })
            .collect()
    }

    /// Edge for a visual relationship
    ///
    /// `None` when the entity is unknown, an attribute, has no distinguishable
    /// direction, or when either endpoint node is not in the projection.
    pub(crate) fn edge(
        &self,
        visual: &VisualRelationship,
        color: String,
        projection: &DiagramProjection,
    ) -> Option<DiagramEdge> {
        let Some(aggregated) = self.index.get(&visual.represented_relationship) else {
            debug!(
                visual = %visual.identifier,
                represented = %visual.represented_relationship,
                "Skipping visual relationship of unknown entity"
            );
            return None;
        };
        let entity = aggregated.entity();

        let (source, target, data) = match entity {
            Entity::Relationship(_) | Entity::RelationshipUsage(_) => {
                if is_attribute(entity) {
                    debug!(id = %aggregated.id, "Attributes are drawn inside their class");
                    return None;
                }
                let ends = entity.ends()?;
                let Some(resolved) = resolve_domain_and_range(ends) else {
                    warn!(id = %aggregated.id, "Relationship has no distinguishable domain and range");
                    return None;
                };
                let source = resolved.domain.concept.clone()?;
                let target = resolved.range.concept.clone()?;
                let kind = match entity {
                    Entity::RelationshipUsage(_) => EdgeKind::RelationshipProfile,
                    _ => EdgeKind::Relationship,
                };
                let data = EdgeData {
                    label: entity.label(self.language),
                    kind,
                    iri: resolved.range.iri.clone(),
                    source_cardinality: resolved.domain.cardinality.map(|c| c.to_string()),
                    target_cardinality: resolved.range.cardinality.map(|c| c.to_string()),
                    color,
                    waypoints: visual.waypoints.clone(),
                    visual_identifier: visual.identifier.clone(),
                };
                (source, target, data)
            }
            Entity::Generalization(generalization) => (
                generalization.child.clone(),
                generalization.parent.clone(),
                EdgeData {
                    label: String::new(),
                    kind: EdgeKind::Generalization,
                    iri: generalization.iri.clone(),
                    source_cardinality: None,
                    target_cardinality: None,
                    color,
                    waypoints: visual.waypoints.clone(),
                    visual_identifier: visual.identifier.clone(),
                },
            ),
            Entity::ClassUsage(usage) => (
                usage.id.clone(),
                usage.usage_of.clone(),
                EdgeData {
                    label: "profile of".to_string(),
                    kind: EdgeKind::ClassProfile,
                    iri: None,
                    source_cardinality: None,
                    target_cardinality: None,
                    color,
                    waypoints: visual.waypoints.clone(),
                    visual_identifier: visual.identifier.clone(),
                },
            ),
            Entity::Class(_) => {
                debug!(id = %aggregated.id, "Classes are drawn as nodes");
                return None;
            }
        };

        if !projection.contains_node(&source) || !projection.contains_node(&target) {
            debug!(id = %aggregated.id, %source, %target, "Edge endpoint is not in the diagram");
            return None;
        }

        Some(DiagramEdge {
            id: aggregated.id.clone(),
            source,
            target,
            data,
        })
    }
}

fn description(entity: &Entity, language: &str) -> Option<String> {
    let description = match entity {
        Entity::Class(class) => Some(&class.description),
        Entity::Relationship(relationship) => Some(&relationship.description),
        Entity::ClassUsage(usage) => usage.description.as_ref(),
        Entity::RelationshipUsage(usage) => usage.description.as_ref(),
        Entity::Generalization(_) => None,
    };
    description
        .and_then(|text| text.preferred(language))
        .map(str::to_string)
}

//! Diagram projection
//!
//! Id-indexed arena of the nodes and edges currently shown. Items are
//! replaced in place, so an item keeps its position in the output order
//! across updates.

use crate::value_objects::{Position, Waypoint};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Attribute listed inside a class node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramAttribute {
    /// Id of the attribute relationship (or attribute profile)
    pub id: String,
    pub label: String,
    pub iri: Option<String>,
    /// Datatype of the attribute value
    pub datatype: Option<String>,
    /// Cardinality rendered as `min..max`
    pub cardinality: Option<String>,
}

/// Payload of a node
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeData {
    pub label: String,
    pub iri: Option<String>,
    pub description: Option<String>,
    /// Color of the owning entity model, `#rrggbb`
    pub color: String,
    pub attributes: Vec<DiagramAttribute>,
    /// Label of the profiled entity, for class profiles
    pub profile_of: Option<String>,
    /// Entity model owning the represented entity
    pub model: String,
    /// Visual node the diagram node was derived from
    pub visual_identifier: String,
}

/// Node of the diagram; its id is the represented entity id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramNode {
    pub id: String,
    pub position: Position,
    pub data: NodeData,
}

/// What an edge stands for
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EdgeKind {
    Relationship,
    RelationshipProfile,
    Generalization,
    /// Link from a class profile to the profiled class
    ClassProfile,
}

/// Payload of an edge
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeData {
    pub label: String,
    pub kind: EdgeKind,
    pub iri: Option<String>,
    pub source_cardinality: Option<String>,
    pub target_cardinality: Option<String>,
    pub color: String,
    pub waypoints: Vec<Waypoint>,
    pub visual_identifier: String,
}

/// Edge of the diagram; its id is the represented entity id
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DiagramEdge {
    pub id: String,
    pub source: String,
    pub target: String,
    pub data: EdgeData,
}

impl DiagramEdge {
    pub fn touches(&self, node_id: &str) -> bool {
        self.source == node_id || self.target == node_id
    }
}

/// Everything handed to the diagram surface
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Diagram {
    pub nodes: Vec<DiagramNode>,
    pub edges: Vec<DiagramEdge>,
}

impl Diagram {
    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.iter().find(|node| node.id == id)
    }

    pub fn edge(&self, id: &str) -> Option<&DiagramEdge> {
        self.edges.iter().find(|edge| edge.id == id)
    }
}

/// Nodes and edges currently rendered, indexed by id
#[derive(Debug, Clone, Default)]
pub struct DiagramProjection {
    nodes: IndexMap<String, DiagramNode>,
    edges: IndexMap<String, DiagramEdge>,
}

impl DiagramProjection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.nodes.clear();
        self.edges.clear();
    }

    /// Insert a node, or replace the node with the same id in place
    pub fn upsert_node(&mut self, node: DiagramNode) {
        match self.nodes.get_mut(&node.id) {
            Some(existing) => *existing = node,
            None => {
                self.nodes.insert(node.id.clone(), node);
            }
        }
    }

    pub fn remove_node(&mut self, id: &str) -> Option<DiagramNode> {
        self.nodes.shift_remove(id)
    }

    /// Insert an edge, or replace the edge with the same id in place
    pub fn upsert_edge(&mut self, edge: DiagramEdge) {
        match self.edges.get_mut(&edge.id) {
            Some(existing) => *existing = edge,
            None => {
                self.edges.insert(edge.id.clone(), edge);
            }
        }
    }

    pub fn remove_edge(&mut self, id: &str) -> Option<DiagramEdge> {
        self.edges.shift_remove(id)
    }

    pub fn node(&self, id: &str) -> Option<&DiagramNode> {
        self.nodes.get(id)
    }

    pub fn edge(&self, id: &str) -> Option<&DiagramEdge> {
        self.edges.get(id)
    }

    pub fn contains_node(&self, id: &str) -> bool {
        self.nodes.contains_key(id)
    }

    pub fn nodes(&self) -> impl Iterator<Item = &DiagramNode> {
        self.nodes.values()
    }

    pub fn edges(&self) -> impl Iterator<Item = &DiagramEdge> {
        self.edges.values()
    }

    /// Ids of the edges starting or ending at a node
    pub fn edges_touching(&self, node_id: &str) -> Vec<String> {
        self.edges
            .values()
            .filter(|edge| edge.touches(node_id))
            .map(|edge| edge.id.clone())
            .collect()
    }

    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    pub fn edge_count(&self) -> usize {
        self.edges.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty() && self.edges.is_empty()
    }

    pub fn to_diagram(&self) -> Diagram {
        Diagram {
            nodes: self.nodes.values().cloned().collect(),
            edges: self.edges.values().cloned().collect(),
        }
    }
}

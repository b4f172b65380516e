//! # Graph Store
//!
//! The in-memory node and relationship store the kernel mutates.
//!
//! Properties are keyed by interned `PropertyKeyId`; labels by `LabelId`.
//! All collections are `BTreeMap`/`BTreeSet` so enumeration order is
//! deterministic. The store is shared between transactions; writers
//! coordinate through entity locks, not through the store itself.

use crate::{EntityKind, KestrelError, LabelId, NodeId, PropertyKeyId, RelationshipId, Value};
use parking_lot::RwLock;
use std::collections::{BTreeMap, BTreeSet};

type PropertyMap = BTreeMap<PropertyKeyId, Value>;

#[derive(Debug, Clone, Default)]
struct NodeRecord {
    labels: BTreeSet<LabelId>,
    properties: PropertyMap,
}

#[derive(Debug, Clone)]
struct RelationshipRecord {
    start: NodeId,
    end: NodeId,
    rel_type: String,
    properties: PropertyMap,
}

#[derive(Debug, Default)]
struct GraphData {
    nodes: BTreeMap<NodeId, NodeRecord>,
    relationships: BTreeMap<RelationshipId, RelationshipRecord>,
    next_node_id: u64,
    next_relationship_id: u64,
}

impl GraphData {
    fn properties(&self, kind: EntityKind, id: u64) -> Option<&PropertyMap> {
        match kind {
            EntityKind::Node => self.nodes.get(&NodeId(id)).map(|n| &n.properties),
            EntityKind::Relationship => self
                .relationships
                .get(&RelationshipId(id))
                .map(|r| &r.properties),
        }
    }

    fn properties_mut(
        &mut self,
        kind: EntityKind,
        id: u64,
    ) -> Result<&mut PropertyMap, KestrelError> {
        let properties = match kind {
            EntityKind::Node => self.nodes.get_mut(&NodeId(id)).map(|n| &mut n.properties),
            EntityKind::Relationship => self
                .relationships
                .get_mut(&RelationshipId(id))
                .map(|r| &mut r.properties),
        };
        properties.ok_or(KestrelError::EntityNotFound { kind, id })
    }
}

/// Shared in-memory graph.
#[derive(Debug, Default)]
pub struct Graph {
    data: RwLock<GraphData>,
}

impl Graph {
    /// Create an empty graph.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a node carrying `labels`.
    pub fn create_node(&self, labels: &[LabelId]) -> NodeId {
        let mut data = self.data.write();
        let id = NodeId(data.next_node_id);
        data.next_node_id = data.next_node_id.saturating_add(1);
        data.nodes.insert(
            id,
            NodeRecord {
                labels: labels.iter().copied().collect(),
                properties: PropertyMap::new(),
            },
        );
        id
    }

    /// Create a relationship of `rel_type` between two existing nodes.
    pub fn create_relationship(
        &self,
        start: NodeId,
        end: NodeId,
        rel_type: impl Into<String>,
    ) -> Result<RelationshipId, KestrelError> {
        let mut data = self.data.write();
        for node in [start, end] {
            if !data.nodes.contains_key(&node) {
                return Err(KestrelError::EntityNotFound {
                    kind: EntityKind::Node,
                    id: node.0,
                });
            }
        }
        let id = RelationshipId(data.next_relationship_id);
        data.next_relationship_id = data.next_relationship_id.saturating_add(1);
        data.relationships.insert(
            id,
            RelationshipRecord {
                start,
                end,
                rel_type: rel_type.into(),
                properties: PropertyMap::new(),
            },
        );
        Ok(id)
    }

    /// Whether the entity exists.
    #[must_use]
    pub fn contains(&self, kind: EntityKind, id: u64) -> bool {
        self.data.read().properties(kind, id).is_some()
    }

    /// Endpoints and type of a relationship.
    #[must_use]
    pub fn relationship(&self, id: RelationshipId) -> Option<(NodeId, NodeId, String)> {
        self.data
            .read()
            .relationships
            .get(&id)
            .map(|r| (r.start, r.end, r.rel_type.clone()))
    }

    /// Number of nodes.
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.data.read().nodes.len()
    }

    /// Number of relationships.
    #[must_use]
    pub fn relationship_count(&self) -> usize {
        self.data.read().relationships.len()
    }

    // -------------------------------------------------------------------------
    // Properties
    // -------------------------------------------------------------------------

    /// Read one property. Absent properties, and properties of entities that
    /// do not exist, read as `NoValue`.
    #[must_use]
    pub fn property(&self, kind: EntityKind, id: u64, key: PropertyKeyId) -> Value {
        self.data
            .read()
            .properties(kind, id)
            .and_then(|props| props.get(&key).cloned())
            .unwrap_or_default()
    }

    /// All properties of an entity; empty when it does not exist.
    #[must_use]
    pub fn properties(&self, kind: EntityKind, id: u64) -> BTreeMap<PropertyKeyId, Value> {
        self.data
            .read()
            .properties(kind, id)
            .cloned()
            .unwrap_or_default()
    }

    /// Property key ids of an entity in ascending order, or `None` when it
    /// does not exist.
    #[must_use]
    pub fn property_keys(&self, kind: EntityKind, id: u64) -> Option<Vec<PropertyKeyId>> {
        self.data
            .read()
            .properties(kind, id)
            .map(|props| props.keys().copied().collect())
    }

    /// Write a property, returning the previous value (`NoValue` if none).
    pub fn set_property(
        &self,
        kind: EntityKind,
        id: u64,
        key: PropertyKeyId,
        value: Value,
    ) -> Result<Value, KestrelError> {
        if !value.is_storable() {
            return Err(KestrelError::InvalidPropertyValue(value.to_string()));
        }
        let mut data = self.data.write();
        let props = data.properties_mut(kind, id)?;
        Ok(props.insert(key, value).unwrap_or_default())
    }

    /// Remove a property; `true` iff it was present.
    pub fn remove_property(
        &self,
        kind: EntityKind,
        id: u64,
        key: PropertyKeyId,
    ) -> Result<bool, KestrelError> {
        let mut data = self.data.write();
        let props = data.properties_mut(kind, id)?;
        Ok(props.remove(&key).is_some())
    }

    // -------------------------------------------------------------------------
    // Labels
    // -------------------------------------------------------------------------

    /// Labels of a node in ascending order; empty when it does not exist.
    #[must_use]
    pub fn labels(&self, node: NodeId) -> Vec<LabelId> {
        self.data
            .read()
            .nodes
            .get(&node)
            .map(|n| n.labels.iter().copied().collect())
            .unwrap_or_default()
    }

    /// Attach labels; returns how many were not already present.
    pub fn add_labels(&self, node: NodeId, labels: &[LabelId]) -> Result<usize, KestrelError> {
        let mut data = self.data.write();
        let record = data
            .nodes
            .get_mut(&node)
            .ok_or(KestrelError::EntityNotFound {
                kind: EntityKind::Node,
                id: node.0,
            })?;
        Ok(labels
            .iter()
            .filter(|label| record.labels.insert(**label))
            .count())
    }

    /// Detach labels; returns how many were present.
    pub fn remove_labels(&self, node: NodeId, labels: &[LabelId]) -> Result<usize, KestrelError> {
        let mut data = self.data.write();
        let record = data
            .nodes
            .get_mut(&node)
            .ok_or(KestrelError::EntityNotFound {
                kind: EntityKind::Node,
                id: node.0,
            })?;
        Ok(labels
            .iter()
            .filter(|label| record.labels.remove(*label))
            .count())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn set_and_read_property() {
        let graph = Graph::new();
        let node = graph.create_node(&[]);

        let previous = graph
            .set_property(EntityKind::Node, node.0, PropertyKeyId(0), Value::Int(1))
            .expect("set");

        assert_eq!(previous, Value::NoValue);
        assert_eq!(
            graph.property(EntityKind::Node, node.0, PropertyKeyId(0)),
            Value::Int(1)
        );
    }

    #[test]
    fn reading_missing_entity_is_absent() {
        let graph = Graph::new();
        assert_eq!(
            graph.property(EntityKind::Node, 42, PropertyKeyId(0)),
            Value::NoValue
        );
        assert!(graph.properties(EntityKind::Relationship, 42).is_empty());
        assert_eq!(graph.property_keys(EntityKind::Node, 42), None);
    }

    #[test]
    fn writing_missing_entity_fails() {
        let graph = Graph::new();
        let result = graph.set_property(EntityKind::Relationship, 3, PropertyKeyId(0), Value::Int(1));
        assert!(matches!(
            result,
            Err(KestrelError::EntityNotFound {
                kind: EntityKind::Relationship,
                id: 3
            })
        ));
    }

    #[test]
    fn unstorable_values_rejected() {
        let graph = Graph::new();
        let node = graph.create_node(&[]);
        let result = graph.set_property(
            EntityKind::Node,
            node.0,
            PropertyKeyId(0),
            Value::map([("a", Value::Int(1))]),
        );
        assert!(matches!(result, Err(KestrelError::InvalidPropertyValue(_))));
        assert!(graph.properties(EntityKind::Node, node.0).is_empty());
    }

    #[test]
    fn remove_reports_presence() {
        let graph = Graph::new();
        let a = graph.create_node(&[]);
        let b = graph.create_node(&[]);
        let rel = graph.create_relationship(a, b, "KNOWS").expect("rel");
        graph
            .set_property(EntityKind::Relationship, rel.0, PropertyKeyId(1), Value::from("x"))
            .expect("set");

        assert!(graph
            .remove_property(EntityKind::Relationship, rel.0, PropertyKeyId(1))
            .expect("remove"));
        assert!(!graph
            .remove_property(EntityKind::Relationship, rel.0, PropertyKeyId(1))
            .expect("remove"));
        assert_eq!(graph.relationship(rel), Some((a, b, "KNOWS".to_string())));
    }

    #[test]
    fn relationship_requires_existing_endpoints() {
        let graph = Graph::new();
        let a = graph.create_node(&[]);
        assert!(graph.create_relationship(a, NodeId(99), "KNOWS").is_err());
        assert_eq!(graph.relationship_count(), 0);
    }

    #[test]
    fn labels_count_only_changes() {
        let graph = Graph::new();
        let node = graph.create_node(&[LabelId(0)]);

        let added = graph
            .add_labels(node, &[LabelId(0), LabelId(1), LabelId(2)])
            .expect("add");
        assert_eq!(added, 2);
        assert_eq!(graph.labels(node), vec![LabelId(0), LabelId(1), LabelId(2)]);

        let removed = graph.remove_labels(node, &[LabelId(1), LabelId(5)]).expect("remove");
        assert_eq!(removed, 1);
        assert_eq!(graph.node_count(), 1);
    }
}

//! The execution row: named slots plus the per-entity property side cache.

use crate::{EntityKind, KestrelError, NodeId, RelationshipId, Value};
use std::collections::BTreeMap;

/// One row of bound values flowing through the mutation operators.
///
/// Besides the named slots the row carries a side cache of entity property
/// values read earlier in the pipeline. Mutation operators invalidate an
/// entity's cached properties before they touch it.
#[derive(Debug, Clone, Default)]
pub struct ExecutionContext {
    slots: BTreeMap<String, Value>,
    cached_properties: BTreeMap<(EntityKind, u64), BTreeMap<String, Value>>,
}

impl ExecutionContext {
    /// An empty row.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder form of `set`.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: Value) -> Self {
        self.set(name, value);
        self
    }

    /// Bind `name` to `value`.
    pub fn set(&mut self, name: impl Into<String>, value: Value) {
        self.slots.insert(name.into(), value);
    }

    /// The value bound to `name`.
    pub fn get_by_name(&self, name: &str) -> Result<Value, KestrelError> {
        self.slots
            .get(name)
            .cloned()
            .ok_or_else(|| KestrelError::UnboundVariable(name.to_string()))
    }

    /// A cached property value, if the row holds one.
    #[must_use]
    pub fn cached_property(&self, kind: EntityKind, id: u64, key: &str) -> Option<&Value> {
        self.cached_properties.get(&(kind, id))?.get(key)
    }

    /// Remember a property value read for an entity.
    pub fn cache_property(&mut self, kind: EntityKind, id: u64, key: &str, value: Value) {
        self.cached_properties
            .entry((kind, id))
            .or_default()
            .insert(key.to_string(), value);
    }

    /// Whether any property of the entity is cached.
    #[must_use]
    pub fn has_cached_properties(&self, kind: EntityKind, id: u64) -> bool {
        self.cached_properties.contains_key(&(kind, id))
    }

    /// Drop every cached property of a node.
    pub fn invalidate_cached_node_properties(&mut self, id: NodeId) {
        self.cached_properties.remove(&(EntityKind::Node, id.0));
    }

    /// Drop every cached property of a relationship.
    pub fn invalidate_cached_relationship_properties(&mut self, id: RelationshipId) {
        self.cached_properties
            .remove(&(EntityKind::Relationship, id.0));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slots_bind_by_name() {
        let row = ExecutionContext::new().with("n", Value::Node(NodeId(1)));
        assert_eq!(row.get_by_name("n").expect("bound"), Value::Node(NodeId(1)));
        assert!(matches!(
            row.get_by_name("m"),
            Err(KestrelError::UnboundVariable(name)) if name == "m"
        ));
    }

    #[test]
    fn invalidation_is_per_entity_and_kind() {
        let mut row = ExecutionContext::new();
        row.cache_property(EntityKind::Node, 1, "a", Value::Int(1));
        row.cache_property(EntityKind::Relationship, 1, "a", Value::Int(2));
        row.cache_property(EntityKind::Node, 2, "a", Value::Int(3));

        row.invalidate_cached_node_properties(NodeId(1));

        assert!(!row.has_cached_properties(EntityKind::Node, 1));
        assert_eq!(
            row.cached_property(EntityKind::Relationship, 1, "a"),
            Some(&Value::Int(2))
        );
        assert_eq!(row.cached_property(EntityKind::Node, 2, "a"), Some(&Value::Int(3)));

        row.invalidate_cached_relationship_properties(RelationshipId(1));
        assert!(!row.has_cached_properties(EntityKind::Relationship, 1));
    }
}

//! # Entity Operations
//!
//! The capability the mutation operators are parameterized by: property
//! writes, key enumeration and exclusive locking for one entity kind.
//!
//! `NodeOperations` and `RelationshipOperations` are the two implementations;
//! a generic operator picks one at compile time, a dynamic operator picks one
//! from the runtime value of its target.

use crate::cursors::{EntityCursor, PropertyCursor, PropertyKeyIds};
use crate::query::ExecutionContext;
use crate::transaction::Transaction;
use crate::{EntityKind, KestrelError, LabelId, NodeId, PropertyKeyId, RelationshipId, Value};

// =============================================================================
// ENTITY OPERATIONS TRAIT
// =============================================================================

/// Property and lock operations for one entity kind.
pub trait EntityOperations: Send + Sync + std::fmt::Debug {
    /// The kind of entity these operations address.
    fn kind(&self) -> EntityKind;

    /// Write a property. The value must be storable.
    fn set_property(
        &self,
        tx: &Transaction,
        id: u64,
        key: PropertyKeyId,
        value: Value,
    ) -> Result<(), KestrelError> {
        tx.graph().set_property(self.kind(), id, key, value)?;
        Ok(())
    }

    /// Remove a property; `true` iff something was removed.
    fn remove_property(
        &self,
        tx: &Transaction,
        id: u64,
        key: PropertyKeyId,
    ) -> Result<bool, KestrelError> {
        tx.graph().remove_property(self.kind(), id, key)
    }

    /// The entity's current property key ids, scanned through caller-owned
    /// cursors. Each call restarts the scan.
    fn property_key_ids<'c>(
        &self,
        tx: &Transaction,
        id: u64,
        entity: &mut EntityCursor,
        properties: &'c mut PropertyCursor,
    ) -> PropertyKeyIds<'c> {
        entity.single(tx.graph(), self.kind(), id);
        entity.properties(tx.graph(), properties);
        PropertyKeyIds::new(properties)
    }

    /// Block until the transaction holds the exclusive lock on the entity.
    fn acquire_exclusive_lock(&self, tx: &Transaction, id: u64) -> Result<(), KestrelError> {
        tx.locks().acquire_exclusive(self.kind(), id)
    }

    /// Release one hold of the exclusive lock on the entity.
    fn release_exclusive_lock(&self, tx: &Transaction, id: u64) {
        tx.locks().release_exclusive(self.kind(), id);
    }

    /// Drop the row's cached copies of the entity's properties.
    fn invalidate_cached_properties(&self, row: &mut ExecutionContext, id: u64);

    /// Interpret a row value as a target of this kind.
    ///
    /// `NoValue` is a null target; a value of another kind is a type error
    /// naming `expression`.
    fn entity_id(&self, value: &Value, expression: &str) -> Result<Option<u64>, KestrelError> {
        match (self.kind(), value) {
            (_, Value::NoValue) => Ok(None),
            (EntityKind::Node, Value::Node(id)) => Ok(Some(id.0)),
            (EntityKind::Relationship, Value::Relationship(id)) => Ok(Some(id.0)),
            (kind, other) => Err(KestrelError::TypeMismatch {
                expression: expression.to_string(),
                expected: match kind {
                    EntityKind::Node => "Node",
                    EntityKind::Relationship => "Relationship",
                },
                value: other.to_string(),
            }),
        }
    }
}

// =============================================================================
// NODES
// =============================================================================

/// Entity operations on nodes.
#[derive(Debug, Clone, Copy, Default)]
pub struct NodeOperations;

impl NodeOperations {
    /// Attach labels; returns how many were newly attached.
    pub fn add_labels(
        &self,
        tx: &Transaction,
        node: NodeId,
        labels: &[LabelId],
    ) -> Result<usize, KestrelError> {
        tx.graph().add_labels(node, labels)
    }

    /// Detach labels; returns how many were attached.
    pub fn remove_labels(
        &self,
        tx: &Transaction,
        node: NodeId,
        labels: &[LabelId],
    ) -> Result<usize, KestrelError> {
        tx.graph().remove_labels(node, labels)
    }
}

impl EntityOperations for NodeOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Node
    }

    fn invalidate_cached_properties(&self, row: &mut ExecutionContext, id: u64) {
        row.invalidate_cached_node_properties(NodeId(id));
    }
}

// =============================================================================
// RELATIONSHIPS
// =============================================================================

/// Entity operations on relationships.
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationshipOperations;

impl EntityOperations for RelationshipOperations {
    fn kind(&self) -> EntityKind {
        EntityKind::Relationship
    }

    fn invalidate_cached_properties(&self, row: &mut ExecutionContext, id: u64) {
        row.invalidate_cached_relationship_properties(RelationshipId(id));
    }
}

// =============================================================================
// LOCK GUARD
// =============================================================================

/// Holds the exclusive lock on one entity until dropped.
///
/// The lock is released on every exit path, including `?` propagation out of
/// the guarded scope.
#[derive(Debug)]
pub struct EntityLock<'a, O: EntityOperations + ?Sized> {
    ops: &'a O,
    tx: &'a Transaction,
    id: u64,
}

impl<'a, O: EntityOperations + ?Sized> EntityLock<'a, O> {
    /// Acquire the lock on `id`.
    pub fn acquire(ops: &'a O, tx: &'a Transaction, id: u64) -> Result<Self, KestrelError> {
        ops.acquire_exclusive_lock(tx, id)?;
        Ok(Self { ops, tx, id })
    }
}

impl<O: EntityOperations + ?Sized> Drop for EntityLock<'_, O> {
    fn drop(&mut self) {
        self.ops.release_exclusive_lock(self.tx, self.id);
    }
}

// =============================================================================
// TESTS
// =============================================================================

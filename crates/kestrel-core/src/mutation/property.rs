//! `SET e.key = value`

use super::{MutationOperation, UpdateCounter, resolve_dynamic_target};
use crate::entity_ops::{EntityLock, EntityOperations, NodeOperations, RelationshipOperations};
use crate::query::{ExecutionContext, Expression, QueryState};
use crate::tokens::LazyPropertyKey;
use crate::KestrelError;

/// Sets one property on the node or relationship bound to a row variable.
///
/// A null value removes the property. Writing a value always counts as one
/// change, even when it equals the stored value.
#[derive(Debug, Clone)]
pub struct SetEntityProperty<O: EntityOperations> {
    ops: O,
    variable: String,
    key: LazyPropertyKey,
    value: Expression,
}

/// `SET n.key = value` on a node variable.
pub type SetNodeProperty = SetEntityProperty<NodeOperations>;

/// `SET r.key = value` on a relationship variable.
pub type SetRelationshipProperty = SetEntityProperty<RelationshipOperations>;

impl<O: EntityOperations + Default> SetEntityProperty<O> {
    #[must_use]
    pub fn new(variable: impl Into<String>, key: impl Into<String>, value: Expression) -> Self {
        Self {
            ops: O::default(),
            variable: variable.into(),
            key: LazyPropertyKey::new(key),
            value,
        }
    }
}

impl<O: EntityOperations> MutationOperation for SetEntityProperty<O> {
    fn name(&self) -> &'static str {
        "SetEntityProperty"
    }

    fn counter(&self) -> UpdateCounter {
        UpdateCounter::PropertiesSet
    }

    fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<u64, KestrelError> {
        let target = row.get_by_name(&self.variable)?;
        match self.ops.entity_id(&target, &self.variable)? {
            Some(id) => set_property(&self.ops, id, &self.key, &self.value, row, state),
            None => Ok(0),
        }
    }
}

/// `SET expr.key = value` where `expr` may evaluate to either entity kind.
#[derive(Debug, Clone)]
pub struct SetDynamicProperty {
    target: Expression,
    key: LazyPropertyKey,
    value: Expression,
}

impl SetDynamicProperty {
    #[must_use]
    pub fn new(target: Expression, key: impl Into<String>, value: Expression) -> Self {
        Self {
            target,
            key: LazyPropertyKey::new(key),
            value,
        }
    }
}

impl MutationOperation for SetDynamicProperty {
    fn name(&self) -> &'static str {
        "SetDynamicProperty"
    }

    fn counter(&self) -> UpdateCounter {
        UpdateCounter::PropertiesSet
    }

    fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<u64, KestrelError> {
        match resolve_dynamic_target(&self.target, row, state)? {
            Some((ops, id)) => set_property(ops, id, &self.key, &self.value, row, state),
            None => Ok(0),
        }
    }
}

fn set_property<O: EntityOperations + ?Sized>(
    ops: &O,
    id: u64,
    key: &LazyPropertyKey,
    value: &Expression,
    row: &mut ExecutionContext,
    state: &QueryState<'_>,
) -> Result<u64, KestrelError> {
    let tx = state.transaction();
    let _lock = EntityLock::acquire(ops, tx, id)?;

    ops.invalidate_cached_properties(row, id);
    let value = value.evaluate(row, state)?;
    // Evaluation may have cached pre-write values of this entity.
    ops.invalidate_cached_properties(row, id);

    if value.is_no_value() {
        return match key.id(tx.property_keys())? {
            Some(key) => Ok(u64::from(ops.remove_property(tx, id, key)?)),
            None => Ok(0),
        };
    }

    let key = key.id_or_create(tx.property_keys())?;
    ops.set_property(tx, id, key, value)?;
    Ok(1)
}

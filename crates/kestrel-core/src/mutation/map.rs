//! `SET e = map` and `SET e += map`

use super::{MutationOperation, UpdateCounter, resolve_dynamic_target};
use crate::entity_ops::{EntityLock, EntityOperations, NodeOperations, RelationshipOperations};
use crate::query::{ExecutionContext, Expression, QueryState};
use crate::transaction::Transaction;
use crate::{EntityKind, KestrelError, PropertyKeyId, Value};
use std::collections::{BTreeMap, BTreeSet};

/// Sets every entry of a map on the entity bound to a row variable.
///
/// With `remove_other_props` (`SET e = map`) the entity ends up with exactly
/// the map's non-null keys; without it (`SET e += map`) keys the map does not
/// mention are left alone. Null entries remove their key either way.
#[derive(Debug, Clone)]
pub struct SetPropertiesFromMap<O: EntityOperations> {
    ops: O,
    variable: String,
    map: Expression,
    remove_other_props: bool,
}

/// `SET n = map` / `SET n += map` on a node variable.
pub type SetNodePropertiesFromMap = SetPropertiesFromMap<NodeOperations>;

/// `SET r = map` / `SET r += map` on a relationship variable.
pub type SetRelationshipPropertiesFromMap = SetPropertiesFromMap<RelationshipOperations>;

impl<O: EntityOperations + Default> SetPropertiesFromMap<O> {
    #[must_use]
    pub fn new(variable: impl Into<String>, map: Expression, remove_other_props: bool) -> Self {
        Self {
            ops: O::default(),
            variable: variable.into(),
            map,
            remove_other_props,
        }
    }
}

impl<O: EntityOperations> MutationOperation for SetPropertiesFromMap<O> {
    fn name(&self) -> &'static str {
        "SetPropertiesFromMap"
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
            Some(id) => set_from_map(&self.ops, id, &self.map, self.remove_other_props, row, state),
            None => Ok(0),
        }
    }
}

/// `SET expr = map` / `SET expr += map` where `expr` may evaluate to either
/// entity kind.
#[derive(Debug, Clone)]
pub struct SetDynamicPropertiesFromMap {
    target: Expression,
    map: Expression,
    remove_other_props: bool,
}

impl SetDynamicPropertiesFromMap {
    #[must_use]
    pub fn new(target: Expression, map: Expression, remove_other_props: bool) -> Self {
        Self {
            target,
            map,
            remove_other_props,
        }
    }
}

impl MutationOperation for SetDynamicPropertiesFromMap {
    fn name(&self) -> &'static str {
        "SetDynamicPropertiesFromMap"
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
            Some((ops, id)) => set_from_map(ops, id, &self.map, self.remove_other_props, row, state),
            None => Ok(0),
        }
    }
}

fn set_from_map<O: EntityOperations + ?Sized>(
    ops: &O,
    id: u64,
    map_expr: &Expression,
    remove_other_props: bool,
    row: &mut ExecutionContext,
    state: &mut QueryState<'_>,
) -> Result<u64, KestrelError> {
    let tx = state.transaction();
    let _lock = EntityLock::acquire(ops, tx, id)?;

    ops.invalidate_cached_properties(row, id);
    let value = map_expr.evaluate(row, state)?;
    ops.invalidate_cached_properties(row, id);
    let map = property_map(map_expr, value, tx)?;

    let mut changes = 0u64;
    let mut staged_names = Vec::with_capacity(map.len());
    let mut staged_values = Vec::with_capacity(map.len());
    for (name, value) in map {
        if value.is_no_value() {
            if let Some(key) = tx.property_keys().optional_id(&name)?
                && ops.remove_property(tx, id, PropertyKeyId(key))?
            {
                changes += 1;
            }
        } else {
            staged_names.push(name);
            staged_values.push(value);
        }
    }

    let mut written = BTreeSet::new();
    if !staged_names.is_empty() {
        let names: Vec<&str> = staged_names.iter().map(String::as_str).collect();
        let keys = tx.property_keys().get_or_create_ids(&names)?;
        for (key, value) in keys.into_iter().zip(staged_values) {
            let key = PropertyKeyId(key);
            ops.set_property(tx, id, key, value)?;
            written.insert(key);
            changes += 1;
        }
    }

    if remove_other_props {
        let cursors = &mut state.cursors;
        let existing =
            ops.property_key_ids(tx, id, &mut cursors.entity, &mut cursors.properties);
        for key in existing {
            if !written.contains(&key) && ops.remove_property(tx, id, key)? {
                changes += 1;
            }
        }
    }

    Ok(changes)
}

/// Reduce the evaluated map expression to name/value pairs.
///
/// Nodes and relationships (virtual ones included) reduce to their property
/// maps; null reduces to the empty map.
fn property_map(
    expr: &Expression,
    value: Value,
    tx: &Transaction,
) -> Result<BTreeMap<String, Value>, KestrelError> {
    match value {
        Value::Map(map) => Ok(map),
        Value::NoValue => Ok(BTreeMap::new()),
        Value::Node(id) => tx.properties_by_name(EntityKind::Node, id.0),
        Value::Relationship(id) => tx.properties_by_name(EntityKind::Relationship, id.0),
        other => Err(expr.type_mismatch("Map", &other)),
    }
}

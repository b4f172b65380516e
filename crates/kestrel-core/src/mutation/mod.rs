//! # Mutation Operators
//!
//! Per-row write operators of an update statement:
//! - `SetEntityProperty` / `SetDynamicProperty`: `SET e.key = value`
//! - `SetPropertiesFromMap` / `SetDynamicPropertiesFromMap`: `SET e = map`
//!   (replace) and `SET e += map` (merge)
//! - `SetLabels` / `RemoveLabels`
//!
//! Every operator returns how many changes it made to the row's target;
//! `MutationPipeline` folds those counts into `UpdateCounts`.
//!
//! Property operators hold the target's exclusive lock for the whole
//! read-modify-write and invalidate the row's cached copies of its
//! properties. Label operators take no lock.

mod labels;
mod map;
mod pipeline;
mod property;

pub use labels::{RemoveLabels, SetLabels};
pub use map::{
    SetDynamicPropertiesFromMap, SetNodePropertiesFromMap, SetPropertiesFromMap,
    SetRelationshipPropertiesFromMap,
};
pub use pipeline::{MutationPipeline, UpdateCounts};
pub use property::{SetDynamicProperty, SetEntityProperty, SetNodeProperty, SetRelationshipProperty};

use crate::entity_ops::{EntityOperations, NodeOperations, RelationshipOperations};
use crate::query::{ExecutionContext, Expression, QueryState};
use crate::{EntityKind, KestrelError, Value};

/// Which statistic an operator's change count feeds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateCounter {
    PropertiesSet,
    LabelsAdded,
    LabelsRemoved,
}

/// One write operator applied to each row.
pub trait MutationOperation: Send + Sync + std::fmt::Debug {
    /// Operator name, used in logs.
    fn name(&self) -> &'static str;

    /// The statistic the returned count feeds.
    fn counter(&self) -> UpdateCounter;

    /// Apply to one row; returns the number of changes made.
    fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<u64, KestrelError>;
}

/// Evaluate a dynamic target and pick the operations for its kind.
///
/// `Ok(None)` is a null target.
fn resolve_dynamic_target(
    target: &Expression,
    row: &mut ExecutionContext,
    state: &QueryState<'_>,
) -> Result<Option<(&'static dyn EntityOperations, u64)>, KestrelError> {
    let value = target.evaluate(row, state)?;
    let entity = value
        .as_entity_ref()
        .ok_or_else(|| invalid_target(target, &value))?;
    Ok(entity.kind_and_id().map(|(kind, id)| {
        let ops: &'static dyn EntityOperations = match kind {
            EntityKind::Node => &NodeOperations,
            EntityKind::Relationship => &RelationshipOperations,
        };
        (ops, id)
    }))
}

fn invalid_target(target: &Expression, value: &Value) -> KestrelError {
    KestrelError::InvalidArgument {
        expression: target.to_string(),
        value: value.to_string(),
    }
}

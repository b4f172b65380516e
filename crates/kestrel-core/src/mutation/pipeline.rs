//! Ordered application of mutation operators and statement statistics.

use super::{MutationOperation, UpdateCounter};
use crate::query::{ExecutionContext, QueryState};
use crate::KestrelError;
use serde::Serialize;
use std::ops::AddAssign;

/// Change statistics of an update statement.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct UpdateCounts {
    pub properties_set: u64,
    pub labels_added: u64,
    pub labels_removed: u64,
}

impl UpdateCounts {
    /// Add `count` to the statistic named by `counter`.
    pub fn record(&mut self, counter: UpdateCounter, count: u64) {
        let slot = match counter {
            UpdateCounter::PropertiesSet => &mut self.properties_set,
            UpdateCounter::LabelsAdded => &mut self.labels_added,
            UpdateCounter::LabelsRemoved => &mut self.labels_removed,
        };
        *slot = slot.saturating_add(count);
    }

    /// Whether the statement changed anything.
    #[must_use]
    pub fn contains_updates(&self) -> bool {
        *self != Self::default()
    }
}

impl AddAssign for UpdateCounts {
    fn add_assign(&mut self, rhs: Self) {
        self.properties_set = self.properties_set.saturating_add(rhs.properties_set);
        self.labels_added = self.labels_added.saturating_add(rhs.labels_added);
        self.labels_removed = self.labels_removed.saturating_add(rhs.labels_removed);
    }
}

/// The mutation operators of one statement, applied in program order.
#[derive(Debug, Default)]
pub struct MutationPipeline {
    operations: Vec<Box<dyn MutationOperation>>,
}

impl MutationPipeline {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an operator.
    #[must_use]
    pub fn then(mut self, operation: impl MutationOperation + 'static) -> Self {
        self.operations.push(Box::new(operation));
        self
    }

    /// Number of operators.
    #[must_use]
    pub fn len(&self) -> usize {
        self.operations.len()
    }

    /// Whether the pipeline has no operators.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.operations.is_empty()
    }

    /// Apply every operator to one row. Later operators observe the effects
    /// of earlier ones. The first error aborts the row.
    pub fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<UpdateCounts, KestrelError> {
        let mut counts = UpdateCounts::default();
        for operation in &self.operations {
            let changed = operation.apply(row, state)?;
            tracing::trace!(operation = operation.name(), changed, "applied mutation");
            counts.record(operation.counter(), changed);
        }
        Ok(counts)
    }

    /// Apply the pipeline to each row in turn.
    pub fn apply_all(
        &self,
        rows: &mut [ExecutionContext],
        state: &mut QueryState<'_>,
    ) -> Result<UpdateCounts, KestrelError> {
        let mut total = UpdateCounts::default();
        for row in rows.iter_mut() {
            total += self.apply(row, state)?;
        }
        tracing::debug!(
            rows = rows.len(),
            properties_set = total.properties_set,
            labels_added = total.labels_added,
            labels_removed = total.labels_removed,
            "applied mutation pipeline"
        );
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::KernelConfig;
    use crate::mutation::{RemoveLabels, SetLabels, SetNodeProperty};
    use crate::query::Expression;
    use crate::transaction::Database;
    use crate::{EntityKind, Value};

    #[test]
    fn later_operations_observe_earlier_ones() {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let node = tx.create_node(&[]).expect("create");
        let mut state = QueryState::new(&tx);
        let mut row = ExecutionContext::new().with("n", Value::Node(node));

        let pipeline = MutationPipeline::new()
            .then(SetNodeProperty::new("n", "count", Expression::literal(1i64)))
            .then(SetNodeProperty::new(
                "n",
                "count",
                Expression::add(
                    Expression::cached_property("n", "count"),
                    Expression::literal(1i64),
                ),
            ))
            .then(SetLabels::new("n", ["A", "B"]))
            .then(RemoveLabels::new("n", ["B"]));

        let counts = pipeline.apply(&mut row, &mut state).expect("apply");
        assert_eq!(
            counts,
            UpdateCounts {
                properties_set: 2,
                labels_added: 2,
                labels_removed: 1,
            }
        );
        assert_eq!(
            tx.property_by_name(EntityKind::Node, node.0, "count").expect("read"),
            Value::Int(2)
        );
    }

    #[test]
    fn apply_all_sums_rows() {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let a = tx.create_node(&[]).expect("a");
        let b = tx.create_node(&[]).expect("b");
        let mut state = QueryState::new(&tx);
        let mut rows = vec![
            ExecutionContext::new().with("n", Value::Node(a)),
            ExecutionContext::new().with("n", Value::Node(b)),
            ExecutionContext::new().with("n", Value::NoValue),
        ];

        let pipeline =
            MutationPipeline::new().then(SetNodeProperty::new("n", "x", Expression::literal(true)));
        let total = pipeline.apply_all(&mut rows, &mut state).expect("apply");

        assert_eq!(total.properties_set, 2);
        assert!(total.contains_updates());
        assert!(!UpdateCounts::default().contains_updates());
    }
}

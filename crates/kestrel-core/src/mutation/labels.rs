//! `SET n:Label` and `REMOVE n:Label`
//!
//! Label writes take no entity lock and leave the row's property cache alone.

use super::{MutationOperation, UpdateCounter};
use crate::entity_ops::{EntityOperations, NodeOperations};
use crate::query::{ExecutionContext, QueryState};
use crate::{KestrelError, LabelId, NodeId};

/// Attaches labels to the node bound to a row variable.
#[derive(Debug, Clone)]
pub struct SetLabels {
    variable: String,
    labels: Vec<String>,
}

impl SetLabels {
    #[must_use]
    pub fn new<S: Into<String>>(variable: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            variable: variable.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl MutationOperation for SetLabels {
    fn name(&self) -> &'static str {
        "SetLabels"
    }

    fn counter(&self) -> UpdateCounter {
        UpdateCounter::LabelsAdded
    }

    fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<u64, KestrelError> {
        let Some(node) = target_node(row, &self.variable)? else {
            return Ok(0);
        };
        let tx = state.transaction();
        let names: Vec<&str> = self.labels.iter().map(String::as_str).collect();
        let ids: Vec<LabelId> = tx
            .labels()
            .get_or_create_ids(&names)?
            .into_iter()
            .map(LabelId)
            .collect();
        let added = NodeOperations.add_labels(tx, node, &ids)?;
        Ok(added as u64)
    }
}

/// Detaches labels from the node bound to a row variable.
///
/// Label names that were never created are skipped; no id is created for
/// them.
#[derive(Debug, Clone)]
pub struct RemoveLabels {
    variable: String,
    labels: Vec<String>,
}

impl RemoveLabels {
    #[must_use]
    pub fn new<S: Into<String>>(variable: impl Into<String>, labels: impl IntoIterator<Item = S>) -> Self {
        Self {
            variable: variable.into(),
            labels: labels.into_iter().map(Into::into).collect(),
        }
    }
}

impl MutationOperation for RemoveLabels {
    fn name(&self) -> &'static str {
        "RemoveLabels"
    }

    fn counter(&self) -> UpdateCounter {
        UpdateCounter::LabelsRemoved
    }

    fn apply(
        &self,
        row: &mut ExecutionContext,
        state: &mut QueryState<'_>,
    ) -> Result<u64, KestrelError> {
        let Some(node) = target_node(row, &self.variable)? else {
            return Ok(0);
        };
        let tx = state.transaction();
        let mut ids = Vec::with_capacity(self.labels.len());
        for name in &self.labels {
            if let Some(id) = tx.labels().optional_id(name)? {
                ids.push(LabelId(id));
            }
        }
        if ids.is_empty() {
            return Ok(0);
        }
        let removed = NodeOperations.remove_labels(tx, node, &ids)?;
        Ok(removed as u64)
    }
}

fn target_node(row: &ExecutionContext, variable: &str) -> Result<Option<NodeId>, KestrelError> {
    let value = row.get_by_name(variable)?;
    Ok(NodeOperations.entity_id(&value, variable)?.map(NodeId))
}

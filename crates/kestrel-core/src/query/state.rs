//! Per-query state shared by every row the query processes.

use crate::cursors::Cursors;
use crate::transaction::Transaction;

/// The transaction a query runs in, plus the cursors it reuses.
#[derive(Debug)]
pub struct QueryState<'tx> {
    tx: &'tx Transaction,
    pub cursors: Cursors,
}

impl<'tx> QueryState<'tx> {
    /// Fresh state for a query running in `tx`.
    #[must_use]
    pub fn new(tx: &'tx Transaction) -> Self {
        Self {
            tx,
            cursors: Cursors::default(),
        }
    }

    /// The transaction.
    #[must_use]
    pub fn transaction(&self) -> &'tx Transaction {
        self.tx
    }
}

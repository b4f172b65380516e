//! # Database & Transactions
//!
//! A `Database` owns the shared graph, the lock manager and the two token
//! registries. A `Transaction` is the view a query executes against: the
//! same shared state plus a lock client of its own.
//!
//! Writes are applied to the shared graph directly; isolation between
//! concurrent writers comes from the per-entity exclusive locks taken by the
//! mutation operators.

use crate::config::KernelConfig;
use crate::graph::Graph;
use crate::locks::{LockClient, LockManager};
use crate::tokens::{TokenHolder, TokenKind, TokenRegistry};
use crate::{EntityKind, KestrelError, LabelId, NodeId, PropertyKeyId, Value};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Shared kernel state.
pub struct Database {
    graph: Arc<Graph>,
    locks: Arc<LockManager>,
    property_keys: Arc<dyn TokenRegistry>,
    labels: Arc<dyn TokenRegistry>,
    next_tx: AtomicU64,
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("nodes", &self.graph.node_count())
            .field("relationships", &self.graph.relationship_count())
            .field("locked", &self.locks.locked_count())
            .finish_non_exhaustive()
    }
}

impl Database {
    /// An in-memory database with in-memory token registries.
    #[must_use]
    pub fn new(config: &KernelConfig) -> Self {
        Self::with_registries(
            config,
            Arc::new(TokenHolder::new(TokenKind::PropertyKey)),
            Arc::new(TokenHolder::new(TokenKind::Label)),
        )
    }

    /// A database using the given token registries.
    #[must_use]
    pub fn with_registries(
        config: &KernelConfig,
        property_keys: Arc<dyn TokenRegistry>,
        labels: Arc<dyn TokenRegistry>,
    ) -> Self {
        Self {
            graph: Arc::new(Graph::new()),
            locks: Arc::new(LockManager::new(config.lock_timeout())),
            property_keys,
            labels,
            next_tx: AtomicU64::new(1),
        }
    }

    /// The shared graph.
    #[must_use]
    pub fn graph(&self) -> &Arc<Graph> {
        &self.graph
    }

    /// The shared lock manager.
    #[must_use]
    pub fn lock_manager(&self) -> &Arc<LockManager> {
        &self.locks
    }

    /// Begin a transaction.
    #[must_use]
    pub fn begin(&self) -> Transaction {
        let id = self.next_tx.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(tx = id, "begin transaction");
        Transaction {
            id,
            graph: Arc::clone(&self.graph),
            locks: self.locks.client(),
            property_keys: Arc::clone(&self.property_keys),
            labels: Arc::clone(&self.labels),
        }
    }
}

/// One transaction's view of the database.
///
/// Dropping the transaction releases any lock it still holds.
pub struct Transaction {
    id: u64,
    graph: Arc<Graph>,
    locks: LockClient,
    property_keys: Arc<dyn TokenRegistry>,
    labels: Arc<dyn TokenRegistry>,
}

impl std::fmt::Debug for Transaction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Transaction")
            .field("id", &self.id)
            .field("lock_client", &self.locks.id())
            .finish_non_exhaustive()
    }
}

impl Transaction {
    /// Transaction id.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// The shared graph.
    #[must_use]
    pub fn graph(&self) -> &Graph {
        &self.graph
    }

    /// This transaction's lock client.
    #[must_use]
    pub fn locks(&self) -> &LockClient {
        &self.locks
    }

    /// The property key registry.
    #[must_use]
    pub fn property_keys(&self) -> &dyn TokenRegistry {
        self.property_keys.as_ref()
    }

    /// The label registry.
    #[must_use]
    pub fn labels(&self) -> &dyn TokenRegistry {
        self.labels.as_ref()
    }

    /// Create a node with the named labels, creating label ids as needed.
    pub fn create_node(&self, labels: &[&str]) -> Result<NodeId, KestrelError> {
        let ids: Vec<LabelId> = self
            .labels
            .get_or_create_ids(labels)?
            .into_iter()
            .map(LabelId)
            .collect();
        Ok(self.graph.create_node(&ids))
    }

    /// Read a property by key name; unknown keys read as `NoValue`.
    pub fn property_by_name(
        &self,
        kind: EntityKind,
        id: u64,
        name: &str,
    ) -> Result<Value, KestrelError> {
        Ok(match self.property_keys.optional_id(name)? {
            Some(key) => self.graph.property(kind, id, PropertyKeyId(key)),
            None => Value::NoValue,
        })
    }

    /// All properties of an entity keyed by name.
    pub fn properties_by_name(
        &self,
        kind: EntityKind,
        id: u64,
    ) -> Result<BTreeMap<String, Value>, KestrelError> {
        let mut named = BTreeMap::new();
        for (key, value) in self.graph.properties(kind, id) {
            let name = self.property_keys.name_of(key.0)?.ok_or_else(|| {
                KestrelError::TokenStoreError(format!("no name for property key id {}", key.0))
            })?;
            named.insert(name, value);
        }
        Ok(named)
    }

    /// Label names of a node, in label id order.
    pub fn label_names(&self, node: NodeId) -> Result<Vec<String>, KestrelError> {
        let mut names = Vec::new();
        for label in self.graph.labels(node) {
            if let Some(name) = self.labels.name_of(label.0)? {
                names.push(name);
            }
        }
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn transactions_share_graph_but_not_lock_clients() {
        let db = Database::new(&KernelConfig::default());
        let tx1 = db.begin();
        let tx2 = db.begin();

        assert_ne!(tx1.id(), tx2.id());
        assert_ne!(tx1.locks().id(), tx2.locks().id());

        let node = tx1.create_node(&["Person"]).expect("create");
        assert!(tx2.graph().contains(EntityKind::Node, node.0));
        assert_eq!(tx2.label_names(node).expect("labels"), vec!["Person"]);
    }

    #[test]
    fn dropping_transaction_releases_locks() {
        let db = Database::new(&KernelConfig::default());
        {
            let tx = db.begin();
            tx.locks()
                .acquire_exclusive(EntityKind::Node, 1)
                .expect("acquire");
            assert!(db.lock_manager().is_locked(EntityKind::Node, 1));
        }
        assert!(!db.lock_manager().is_locked(EntityKind::Node, 1));
    }

    #[test]
    fn unknown_key_reads_as_no_value() {
        let db = Database::new(&KernelConfig::default());
        let tx = db.begin();
        let node = tx.create_node(&[]).expect("create");
        assert_eq!(
            tx.property_by_name(EntityKind::Node, node.0, "missing")
                .expect("read"),
            Value::NoValue
        );
        assert!(tx.properties_by_name(EntityKind::Node, node.0).expect("read").is_empty());
    }
}

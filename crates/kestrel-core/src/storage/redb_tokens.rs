//! # redb-backed Token Store
//!
//! A durable `TokenRegistry` using the redb embedded database.
//!
//! Every name is stored twice, `name -> id` and `id -> name`, so both
//! directions survive a restart. An in-memory cache answers lookups; the
//! database is only touched when names are created.
//!
//! A batch of unseen names is written in a single redb transaction, so
//! interning N new keys costs one commit, not N.

use crate::KestrelError;
use crate::tokens::{TokenKind, TokenRegistry};
use parking_lot::RwLock;
use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;

/// Property key table: name -> id
const PROPERTY_KEY_IDS: TableDefinition<&str, u32> = TableDefinition::new("property_key_ids");

/// Property key table: id -> name
const PROPERTY_KEY_NAMES: TableDefinition<u32, &str> = TableDefinition::new("property_key_names");

/// Label table: name -> id
const LABEL_IDS: TableDefinition<&str, u32> = TableDefinition::new("label_ids");

/// Label table: id -> name
const LABEL_NAMES: TableDefinition<u32, &str> = TableDefinition::new("label_names");

type IdTable = TableDefinition<'static, &'static str, u32>;
type NameTable = TableDefinition<'static, u32, &'static str>;

fn tables(kind: TokenKind) -> (IdTable, NameTable) {
    match kind {
        TokenKind::PropertyKey => (PROPERTY_KEY_IDS, PROPERTY_KEY_NAMES),
        TokenKind::Label => (LABEL_IDS, LABEL_NAMES),
    }
}

fn store_error(e: impl std::fmt::Display) -> KestrelError {
    KestrelError::TokenStoreError(e.to_string())
}

#[derive(Debug, Default)]
struct TokenCache {
    by_name: BTreeMap<String, u32>,
    by_id: BTreeMap<u32, String>,
}

impl TokenCache {
    fn next_id(&self) -> u32 {
        self.by_id
            .last_key_value()
            .map(|(id, _)| id.saturating_add(1))
            .unwrap_or(0)
    }
}

/// A durable token registry for one namespace.
pub struct RedbTokenStore {
    db: Arc<Database>,
    kind: TokenKind,
    cache: RwLock<TokenCache>,
}

impl std::fmt::Debug for RedbTokenStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RedbTokenStore")
            .field("kind", &self.kind)
            .field("cached_tokens", &self.cache.read().by_id.len())
            .finish_non_exhaustive()
    }
}

impl RedbTokenStore {
    /// Open or create a token store file for one namespace.
    pub fn open(path: impl AsRef<Path>, kind: TokenKind) -> Result<Self, KestrelError> {
        let db = Database::create(path.as_ref()).map_err(store_error)?;
        Self::with_database(Arc::new(db), kind)
    }

    /// Use an already open database; several namespaces may share one file.
    pub fn with_database(db: Arc<Database>, kind: TokenKind) -> Result<Self, KestrelError> {
        let (ids, names) = tables(kind);

        // Initialize tables if they don't exist
        {
            let write_txn = db.begin_write().map_err(store_error)?;
            let _ = write_txn.open_table(ids).map_err(store_error)?;
            let _ = write_txn.open_table(names).map_err(store_error)?;
            write_txn.commit().map_err(store_error)?;
        }

        let mut cache = TokenCache::default();
        {
            let read_txn = db.begin_read().map_err(store_error)?;
            let table = read_txn.open_table(names).map_err(store_error)?;
            for entry in table.iter().map_err(store_error)? {
                let (id, name) = entry.map_err(store_error)?;
                cache.by_name.insert(name.value().to_string(), id.value());
                cache.by_id.insert(id.value(), name.value().to_string());
            }
        }

        tracing::debug!(
            kind = kind.as_str(),
            tokens = cache.by_id.len(),
            "opened token store"
        );

        Ok(Self {
            db,
            kind,
            cache: RwLock::new(cache),
        })
    }

    /// Number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.cache.read().by_id.len()
    }

    /// Whether no name has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Resolve `names`, creating unseen ones in one write transaction.
    fn resolve(&self, names: &[&str]) -> Result<Vec<u32>, KestrelError> {
        let mut cache = self.cache.write();
        let mut pending: BTreeMap<&str, u32> = BTreeMap::new();
        let mut next_id = cache.next_id();
        let mut ids = Vec::with_capacity(names.len());

        for &name in names {
            let id = if let Some(&id) = cache.by_name.get(name) {
                id
            } else if let Some(&id) = pending.get(name) {
                id
            } else {
                let id = next_id;
                next_id = next_id.saturating_add(1);
                pending.insert(name, id);
                id
            };
            ids.push(id);
        }

        if pending.is_empty() {
            return Ok(ids);
        }

        let (id_table, name_table) = tables(self.kind);
        let write_txn = self.db.begin_write().map_err(store_error)?;
        {
            let mut by_name = write_txn.open_table(id_table).map_err(store_error)?;
            let mut by_id = write_txn.open_table(name_table).map_err(store_error)?;
            for (&name, &id) in &pending {
                by_name.insert(name, id).map_err(store_error)?;
                by_id.insert(id, name).map_err(store_error)?;
            }
        }
        write_txn.commit().map_err(store_error)?;

        // Update in-memory state only after successful commit.
        tracing::debug!(
            kind = self.kind.as_str(),
            created = pending.len(),
            "persisted new tokens"
        );
        for (name, id) in pending {
            cache.by_name.insert(name.to_string(), id);
            cache.by_id.insert(id, name.to_string());
        }

        Ok(ids)
    }
}

impl TokenRegistry for RedbTokenStore {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn optional_id(&self, name: &str) -> Result<Option<u32>, KestrelError> {
        Ok(self.cache.read().by_name.get(name).copied())
    }

    fn get_or_create_id(&self, name: &str) -> Result<u32, KestrelError> {
        if let Some(id) = self.optional_id(name)? {
            return Ok(id);
        }
        let ids = self.resolve(&[name])?;
        ids.first()
            .copied()
            .ok_or_else(|| store_error(format!("no id resolved for '{name}'")))
    }

    fn get_or_create_ids(&self, names: &[&str]) -> Result<Vec<u32>, KestrelError> {
        self.resolve(names)
    }

    fn name_of(&self, id: u32) -> Result<Option<String>, KestrelError> {
        Ok(self.cache.read().by_id.get(&id).cloned())
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn creates_and_looks_up_tokens() {
        let temp = tempdir().expect("temp dir");
        let store =
            RedbTokenStore::open(temp.path().join("tokens.redb"), TokenKind::PropertyKey)
                .expect("open");

        assert_eq!(store.optional_id("name").expect("lookup"), None);
        assert_eq!(store.get_or_create_id("name").expect("create"), 0);
        assert_eq!(store.get_or_create_id("name").expect("create"), 0);
        assert_eq!(store.optional_id("name").expect("lookup"), Some(0));
        assert_eq!(store.name_of(0).expect("name"), Some("name".to_string()));
    }

    #[test]
    fn batch_deduplicates_within_request() {
        let temp = tempdir().expect("temp dir");
        let store = RedbTokenStore::open(temp.path().join("tokens.redb"), TokenKind::Label)
            .expect("open");

        let ids = store
            .get_or_create_ids(&["Person", "City", "Person"])
            .expect("batch");

        assert_eq!(ids, vec![0, 1, 0]);
        assert_eq!(store.len(), 2);
    }

    #[test]
    fn persistence() {
        let temp = tempdir().expect("temp dir");
        let path = temp.path().join("tokens.redb");

        // Create and populate
        {
            let store = RedbTokenStore::open(&path, TokenKind::PropertyKey).expect("open");
            store.get_or_create_ids(&["a", "b", "c"]).expect("batch");
        }

        // Reopen and verify
        {
            let store = RedbTokenStore::open(&path, TokenKind::PropertyKey).expect("open");
            assert_eq!(store.len(), 3);
            assert_eq!(store.optional_id("c").expect("lookup"), Some(2));
            assert_eq!(store.get_or_create_id("d").expect("create"), 3);
        }
    }

    #[test]
    fn namespaces_share_a_file_independently() {
        let temp = tempdir().expect("temp dir");
        let db = Arc::new(Database::create(temp.path().join("tokens.redb")).expect("create"));
        let keys = RedbTokenStore::with_database(db.clone(), TokenKind::PropertyKey)
            .expect("keys");
        let labels = RedbTokenStore::with_database(db, TokenKind::Label).expect("labels");

        keys.get_or_create_id("name").expect("create");
        assert_eq!(labels.optional_id("name").expect("lookup"), None);
        assert_eq!(labels.get_or_create_id("Person").expect("create"), 0);
    }
}

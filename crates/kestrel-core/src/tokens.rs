//! # Token Registries
//!
//! Property key and label names are interned to small integer ids.
//!
//! - `TokenRegistry` is the contract the kernel consumes
//! - `TokenHolder` is the in-memory registry
//! - `RedbTokenStore` (in `storage`) is the durable one
//! - `LazyPropertyKey` memoizes the id of one key name
//!
//! Ids are append-only and never reused. Creating the same unseen name from
//! two transactions at once is serialized by the registry, not by callers.

use crate::{KestrelError, PropertyKeyId};
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU32, Ordering};

// =============================================================================
// TOKEN KIND
// =============================================================================

/// Which namespace a registry interns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    PropertyKey,
    Label,
}

impl TokenKind {
    /// Human-readable name, used in logs.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::PropertyKey => "property key",
            Self::Label => "label",
        }
    }
}

// =============================================================================
// REGISTRY TRAIT
// =============================================================================

/// Name-to-id interning for one token namespace.
pub trait TokenRegistry: Send + Sync {
    /// The namespace this registry interns.
    fn kind(&self) -> TokenKind;

    /// The id of `name`, if it has ever been created.
    fn optional_id(&self, name: &str) -> Result<Option<u32>, KestrelError>;

    /// The id of `name`, creating it when unseen.
    fn get_or_create_id(&self, name: &str) -> Result<u32, KestrelError>;

    /// Ids of all `names`, creating unseen ones, in input order.
    ///
    /// Implementations resolve the whole batch under one write, so callers
    /// with several unseen names must prefer this over repeated
    /// `get_or_create_id` calls.
    fn get_or_create_ids(&self, names: &[&str]) -> Result<Vec<u32>, KestrelError>;

    /// The name registered for `id`.
    fn name_of(&self, id: u32) -> Result<Option<String>, KestrelError>;
}

// =============================================================================
// IN-MEMORY REGISTRY
// =============================================================================

#[derive(Debug, Default)]
struct TokenTable {
    by_name: BTreeMap<String, u32>,
    by_id: Vec<String>,
}

impl TokenTable {
    fn intern(&mut self, name: &str) -> (u32, bool) {
        if let Some(&id) = self.by_name.get(name) {
            return (id, false);
        }
        let id = self.by_id.len() as u32;
        self.by_id.push(name.to_string());
        self.by_name.insert(name.to_string(), id);
        (id, true)
    }
}

/// In-memory token registry.
#[derive(Debug)]
pub struct TokenHolder {
    kind: TokenKind,
    table: RwLock<TokenTable>,
}

impl TokenHolder {
    /// Create an empty registry for `kind`.
    #[must_use]
    pub fn new(kind: TokenKind) -> Self {
        Self {
            kind,
            table: RwLock::new(TokenTable::default()),
        }
    }

    /// Number of interned names.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().by_id.len()
    }

    /// Whether no name has been interned yet.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl TokenRegistry for TokenHolder {
    fn kind(&self) -> TokenKind {
        self.kind
    }

    fn optional_id(&self, name: &str) -> Result<Option<u32>, KestrelError> {
        Ok(self.table.read().by_name.get(name).copied())
    }

    fn get_or_create_id(&self, name: &str) -> Result<u32, KestrelError> {
        if let Some(id) = self.optional_id(name)? {
            return Ok(id);
        }
        let (id, created) = self.table.write().intern(name);
        if created {
            tracing::debug!(kind = self.kind.as_str(), name, id, "created token");
        }
        Ok(id)
    }

    fn get_or_create_ids(&self, names: &[&str]) -> Result<Vec<u32>, KestrelError> {
        let mut table = self.table.write();
        let mut created = 0usize;
        let ids = names
            .iter()
            .map(|name| {
                let (id, fresh) = table.intern(name);
                created += usize::from(fresh);
                id
            })
            .collect();
        if created > 0 {
            tracing::debug!(kind = self.kind.as_str(), created, "created tokens in batch");
        }
        Ok(ids)
    }

    fn name_of(&self, id: u32) -> Result<Option<String>, KestrelError> {
        Ok(self.table.read().by_id.get(id as usize).cloned())
    }
}

// =============================================================================
// LAZY PROPERTY KEY
// =============================================================================

const UNKNOWN: u32 = u32::MAX;

/// A property key name with a memoized id.
///
/// The id is resolved on first use and cached until `invalidate()` resets it
/// to unknown, which forces the next use to look it up again.
#[derive(Debug)]
pub struct LazyPropertyKey {
    name: String,
    id: AtomicU32,
}

impl LazyPropertyKey {
    /// A key whose id has not been resolved yet.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id: AtomicU32::new(UNKNOWN),
        }
    }

    /// The key name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The id if it exists, without creating it.
    ///
    /// Misses are not memoized: a key unknown now may be created later.
    pub fn id(&self, registry: &dyn TokenRegistry) -> Result<Option<PropertyKeyId>, KestrelError> {
        if let Some(id) = self.cached() {
            return Ok(Some(id));
        }
        let id = registry.optional_id(&self.name)?;
        if let Some(id) = id {
            self.id.store(id, Ordering::Relaxed);
        }
        Ok(id.map(PropertyKeyId))
    }

    /// The id, creating the key when unseen.
    pub fn id_or_create(&self, registry: &dyn TokenRegistry) -> Result<PropertyKeyId, KestrelError> {
        if let Some(id) = self.cached() {
            return Ok(id);
        }
        let id = registry.get_or_create_id(&self.name)?;
        self.id.store(id, Ordering::Relaxed);
        Ok(PropertyKeyId(id))
    }

    /// Forget the memoized id.
    pub fn invalidate(&self) {
        self.id.store(UNKNOWN, Ordering::Relaxed);
    }

    fn cached(&self) -> Option<PropertyKeyId> {
        match self.id.load(Ordering::Relaxed) {
            UNKNOWN => None,
            id => Some(PropertyKeyId(id)),
        }
    }
}

impl Clone for LazyPropertyKey {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            id: AtomicU32::new(self.id.load(Ordering::Relaxed)),
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

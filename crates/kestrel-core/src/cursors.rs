//! # Cursors
//!
//! Caller-owned scan resources. A query allocates one `EntityCursor` and one
//! `PropertyCursor` and reuses them for every property-key scan it performs,
//! so a scan never allocates once the buffers have grown.

use crate::graph::Graph;
use crate::{EntityKind, PropertyKeyId};

/// Positions on a single entity.
#[derive(Debug, Default)]
pub struct EntityCursor {
    position: Option<(EntityKind, u64)>,
}

impl EntityCursor {
    /// An unpositioned cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Position on the entity; returns `false` (and stays unpositioned) when
    /// it does not exist.
    pub fn single(&mut self, graph: &Graph, kind: EntityKind, id: u64) -> bool {
        self.position = graph.contains(kind, id).then_some((kind, id));
        self.position.is_some()
    }

    /// The entity the cursor is positioned on.
    #[must_use]
    pub fn position(&self) -> Option<(EntityKind, u64)> {
        self.position
    }

    /// Load the property key ids of the current entity into `properties`.
    ///
    /// An unpositioned cursor leaves `properties` empty.
    pub fn properties(&self, graph: &Graph, properties: &mut PropertyCursor) {
        properties.reset();
        if let Some((kind, id)) = self.position
            && let Some(keys) = graph.property_keys(kind, id)
        {
            properties.keys.extend(keys);
        }
    }
}

/// Iterates the property key ids of one entity.
#[derive(Debug, Default)]
pub struct PropertyCursor {
    keys: Vec<PropertyKeyId>,
    next: usize,
}

impl PropertyCursor {
    /// An empty cursor.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn reset(&mut self) {
        self.keys.clear();
        self.next = 0;
    }

    /// Advance to the next key.
    pub fn next_key(&mut self) -> Option<PropertyKeyId> {
        let key = self.keys.get(self.next).copied()?;
        self.next += 1;
        Some(key)
    }
}

/// Lazy sequence of property key ids backed by a `PropertyCursor`.
#[derive(Debug)]
pub struct PropertyKeyIds<'c> {
    cursor: &'c mut PropertyCursor,
}

impl<'c> PropertyKeyIds<'c> {
    pub(crate) fn new(cursor: &'c mut PropertyCursor) -> Self {
        Self { cursor }
    }
}

impl Iterator for PropertyKeyIds<'_> {
    type Item = PropertyKeyId;

    fn next(&mut self) -> Option<Self::Item> {
        self.cursor.next_key()
    }
}

/// The pair of cursors a query reuses for property-key scans.
#[derive(Debug, Default)]
pub struct Cursors {
    pub entity: EntityCursor,
    pub properties: PropertyCursor,
}

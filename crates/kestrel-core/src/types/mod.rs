//! # Core Type Definitions
//!
//! This module contains the core types shared by the mutation operators and
//! the transaction log:
//! - Entity and token identifiers (`NodeId`, `RelationshipId`, `PropertyKeyId`, `LabelId`)
//! - Entity kinds and references (`EntityKind`, `EntityRef`)
//! - Runtime values (`Value`)
//! - Error types (`KestrelError`)
//!
//! ## Determinism Guarantees
//!
//! All identifier types implement `Ord` so they can key `BTreeMap`/`BTreeSet`
//! and enumerate in a stable order.

mod value;

pub use value::Value;

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

// =============================================================================
// ENTITY IDENTIFIERS
// =============================================================================

/// Identifier of a node in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId(pub u64);

/// Identifier of a relationship in the graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipId(pub u64);

impl fmt::Display for NodeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Node[{}]", self.0)
    }
}

impl fmt::Display for RelationshipId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Relationship[{}]", self.0)
    }
}

// =============================================================================
// TOKEN IDENTIFIERS
// =============================================================================

/// Interned id of a property key name.
///
/// Ids are append-only: once handed out they are never reused or renumbered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct PropertyKeyId(pub u32);

/// Interned id of a label name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct LabelId(pub u32);

// =============================================================================
// ENTITY KINDS & REFERENCES
// =============================================================================

/// The two kinds of graph entity that carry properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKind {
    Node,
    Relationship,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Node => f.write_str("node"),
            Self::Relationship => f.write_str("relationship"),
        }
    }
}

/// A resolved mutation target.
///
/// `Null` is a valid, terminal target: the mutation is a no-op for the row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityRef {
    Node(NodeId),
    Relationship(RelationshipId),
    Null,
}

impl EntityRef {
    /// Kind and raw id of the target, or `None` for `Null`.
    #[must_use]
    pub fn kind_and_id(self) -> Option<(EntityKind, u64)> {
        match self {
            Self::Node(id) => Some((EntityKind::Node, id.0)),
            Self::Relationship(id) => Some((EntityKind::Relationship, id.0)),
            Self::Null => None,
        }
    }
}

// =============================================================================
// ERROR TYPES
// =============================================================================

/// Errors raised by the Kestrel kernel.
///
/// - No silent failures
/// - Use `Result<T, KestrelError>` for fallible operations
/// - The only local recovery in the kernel is lock release; everything else
///   propagates to the caller
#[derive(Debug, Error)]
pub enum KestrelError {
    /// An expression produced a value of the wrong type for its position.
    #[error("Expected {expression} to be a {expected}, but it was `{value}`")]
    TypeMismatch {
        expression: String,
        expected: &'static str,
        value: String,
    },

    /// A mutation target resolved to something that is neither a node,
    /// a relationship nor null.
    #[error(
        "The expression {expression} should have been a node or a relationship, but got {value}"
    )]
    InvalidArgument { expression: String, value: String },

    /// The row has no slot with this name.
    #[error("Variable `{0}` is not bound in this row")]
    UnboundVariable(String),

    /// Arithmetic on values failed (overflow).
    #[error("Arithmetic error: {0}")]
    Arithmetic(String),

    /// A value that cannot be stored as a property.
    #[error("Property values can only be of primitive types or arrays thereof, got {0}")]
    InvalidPropertyValue(String),

    /// The entity does not exist in the graph.
    #[error("Unable to load {kind} with id {id}")]
    EntityNotFound { kind: EntityKind, id: u64 },

    /// The lock could not be acquired before the configured timeout.
    #[error("Unable to acquire exclusive lock on {kind} {id} within {waited_ms} ms")]
    LockAcquisitionTimeout {
        kind: EntityKind,
        id: u64,
        waited_ms: u64,
    },

    /// Fewer bytes were available than the log header requires.
    #[error(
        "Unable to read log header{}: read {read} of {expected} bytes",
        describe_path(.path)
    )]
    IncompleteLogHeader {
        path: Option<PathBuf>,
        read: usize,
        expected: usize,
    },

    /// The log header carries a format version with no known decoder.
    #[error("Unrecognized transaction log format version: {0}")]
    UnrecognizedLogFormat(u8),

    /// The log header decoded but its content is inconsistent.
    #[error("Corrupt log header: {0}")]
    CorruptLogHeader(String),

    /// No segment file exists for the requested log version.
    #[error("No such log file: {}", .0.display())]
    NoSuchLogFile(PathBuf),

    /// The store id could not be encoded or decoded.
    #[error("Store id error: {0}")]
    StoreIdError(String),

    /// The durable token store failed.
    #[error("Token store error: {0}")]
    TokenStoreError(String),

    /// The configuration file could not be read or parsed.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn describe_path(path: &Option<PathBuf>) -> String {
    path.as_ref()
        .map(|p| format!(" from {}", p.display()))
        .unwrap_or_default()
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn entity_ref_kind_and_id() {
        assert_eq!(
            EntityRef::Node(NodeId(4)).kind_and_id(),
            Some((EntityKind::Node, 4))
        );
        assert_eq!(
            EntityRef::Relationship(RelationshipId(9)).kind_and_id(),
            Some((EntityKind::Relationship, 9))
        );
        assert_eq!(EntityRef::Null.kind_and_id(), None);
    }

    #[test]
    fn incomplete_header_message_mentions_path_when_known() {
        let err = KestrelError::IncompleteLogHeader {
            path: Some(PathBuf::from("txlog.3")),
            read: 7,
            expected: 8,
        };
        assert_eq!(
            err.to_string(),
            "Unable to read log header from txlog.3: read 7 of 8 bytes"
        );

        let err = KestrelError::IncompleteLogHeader {
            path: None,
            read: 0,
            expected: 8,
        };
        assert_eq!(err.to_string(), "Unable to read log header: read 0 of 8 bytes");
    }

    #[test]
    fn identifiers_order_deterministically() {
        let mut ids = vec![PropertyKeyId(3), PropertyKeyId(1), PropertyKeyId(2)];
        ids.sort();
        assert_eq!(ids, vec![PropertyKeyId(1), PropertyKeyId(2), PropertyKeyId(3)]);
    }
}

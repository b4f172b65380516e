//! # kestrel-core
//!
//! The transactional kernel of Kestrel - THE WRITE PATH.
//!
//! This crate holds the two pieces every write and every recovery goes
//! through:
//!
//! - **Mutation operators**: `SET`-style property and label writes applied to
//!   one row at a time against a live transaction, with per-entity exclusive
//!   locking, property-key interning and cached-property invalidation
//! - **Transaction log**: the versioned segment header codec, segment files
//!   and the bridge that carries readers from one segment to the next
//!
//! ## Architectural Constraints
//!
//! - Synchronous: no async, no network dependencies
//! - Deterministic: every enumerable collection is a `BTreeMap`/`BTreeSet`
//! - Bit-exact: header layouts must read files written by older releases
//! - No silent failures: every fallible operation returns `KestrelError`

// =============================================================================
// MODULES
// =============================================================================

pub mod config;
pub mod cursors;
pub mod entity_ops;
pub mod graph;
pub mod locks;
pub mod log;
pub mod mutation;
pub mod primitives;
pub mod query;
pub mod storage;
pub mod tokens;
pub mod transaction;
pub mod types;

// =============================================================================
// RE-EXPORTS: Core Types (from types module)
// =============================================================================

pub use types::{
    EntityKind, EntityRef, KestrelError, LabelId, NodeId, PropertyKeyId, RelationshipId, Value,
};

// =============================================================================
// RE-EXPORTS: Kernel
// =============================================================================

pub use config::KernelConfig;
pub use cursors::{Cursors, EntityCursor, PropertyCursor, PropertyKeyIds};
pub use entity_ops::{EntityLock, EntityOperations, NodeOperations, RelationshipOperations};
pub use graph::Graph;
pub use locks::{LockClient, LockManager};
pub use query::{ExecutionContext, Expression, QueryState};
pub use storage::RedbTokenStore;
pub use tokens::{LazyPropertyKey, TokenHolder, TokenKind, TokenRegistry};
pub use transaction::{Database, Transaction};

// =============================================================================
// RE-EXPORTS: Mutation Operators
// =============================================================================

pub use mutation::{
    MutationOperation, MutationPipeline, RemoveLabels, SetDynamicPropertiesFromMap,
    SetDynamicProperty, SetEntityProperty, SetLabels, SetNodePropertiesFromMap, SetNodeProperty,
    SetPropertiesFromMap, SetRelationshipPropertiesFromMap, SetRelationshipProperty,
    UpdateCounter, UpdateCounts,
};

// =============================================================================
// RE-EXPORTS: Transaction Log
// =============================================================================

pub use log::{
    ChainedLogReader, LogFiles, LogFormat, LogHeader, LogSegment, ReaderLogVersionBridge,
    SegmentSource, StoreId, VersionedChannel, encode_log_header, read_log_header,
    write_log_header,
};

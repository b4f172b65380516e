//! # Entity Locks
//!
//! Per-entity exclusive locks, the sole concurrency-correctness mechanism of
//! the mutation operators.
//!
//! - A lock is owned by one `LockClient` (one transaction)
//! - Re-acquiring a lock the client already holds nests; it is released when
//!   every acquire has been matched by a release
//! - Other clients block until the lock is released or the manager's timeout
//!   expires, which fails with `LockAcquisitionTimeout`
//! - Dropping a client releases everything it still holds

use crate::{EntityKind, KestrelError};
use parking_lot::{Condvar, Mutex};
use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

type LockKey = (EntityKind, u64);

#[derive(Debug, Clone, Copy)]
struct Holder {
    client: u64,
    count: u32,
}

/// Coordinates exclusive entity locks between transactions.
#[derive(Debug)]
pub struct LockManager {
    held: Mutex<BTreeMap<LockKey, Holder>>,
    released: Condvar,
    timeout: Duration,
    next_client: AtomicU64,
}

impl LockManager {
    /// Create a manager whose acquisitions give up after `timeout`.
    #[must_use]
    pub fn new(timeout: Duration) -> Self {
        Self {
            held: Mutex::new(BTreeMap::new()),
            released: Condvar::new(),
            timeout,
            next_client: AtomicU64::new(1),
        }
    }

    /// Create a new lock client (one per transaction).
    #[must_use]
    pub fn client(self: &Arc<Self>) -> LockClient {
        LockClient {
            manager: Arc::clone(self),
            id: self.next_client.fetch_add(1, Ordering::Relaxed),
        }
    }

    /// Whether any client holds the lock on the entity.
    #[must_use]
    pub fn is_locked(&self, kind: EntityKind, id: u64) -> bool {
        self.held.lock().contains_key(&(kind, id))
    }

    /// Number of entities currently locked.
    #[must_use]
    pub fn locked_count(&self) -> usize {
        self.held.lock().len()
    }

    fn acquire(&self, client: u64, kind: EntityKind, id: u64) -> Result<(), KestrelError> {
        let key = (kind, id);
        let deadline = Instant::now() + self.timeout;
        let mut held = self.held.lock();
        let mut waiting = false;

        loop {
            let owner = held.get(&key).map(|holder| holder.client);
            match owner {
                None => {
                    held.insert(key, Holder { client, count: 1 });
                    return Ok(());
                }
                Some(owner) if owner == client => {
                    if let Some(holder) = held.get_mut(&key) {
                        holder.count = holder.count.saturating_add(1);
                    }
                    return Ok(());
                }
                Some(owner) => {
                    if !waiting {
                        tracing::debug!(%kind, id, client, owner, "waiting for exclusive lock");
                        waiting = true;
                    }
                    let timed_out = self.released.wait_until(&mut held, deadline).timed_out();
                    let still_taken = held
                        .get(&key)
                        .is_some_and(|holder| holder.client != client);
                    if timed_out && still_taken {
                        tracing::warn!(%kind, id, client, "exclusive lock acquisition timed out");
                        return Err(KestrelError::LockAcquisitionTimeout {
                            kind,
                            id,
                            waited_ms: self.timeout.as_millis() as u64,
                        });
                    }
                }
            }
        }
    }

    fn release(&self, client: u64, kind: EntityKind, id: u64) -> bool {
        let key = (kind, id);
        let mut held = self.held.lock();
        let Some(holder) = held.get_mut(&key) else {
            return false;
        };
        if holder.client != client {
            return false;
        }
        holder.count = holder.count.saturating_sub(1);
        if holder.count == 0 {
            held.remove(&key);
            self.released.notify_all();
        }
        true
    }

    fn release_all(&self, client: u64) {
        let mut held = self.held.lock();
        let before = held.len();
        held.retain(|_, holder| holder.client != client);
        if held.len() != before {
            self.released.notify_all();
        }
    }
}

/// The lock-holding identity of one transaction.
#[derive(Debug)]
pub struct LockClient {
    manager: Arc<LockManager>,
    id: u64,
}

impl LockClient {
    /// Client id, unique within its manager.
    #[must_use]
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Block until the exclusive lock on the entity is held by this client.
    pub fn acquire_exclusive(&self, kind: EntityKind, id: u64) -> Result<(), KestrelError> {
        self.manager.acquire(self.id, kind, id)
    }

    /// Release one hold of the exclusive lock.
    ///
    /// Returns `false` when this client did not hold the lock.
    pub fn release_exclusive(&self, kind: EntityKind, id: u64) -> bool {
        let released = self.manager.release(self.id, kind, id);
        if !released {
            tracing::warn!(%kind, id, client = self.id, "released a lock that was not held");
        }
        released
    }
}

impl Drop for LockClient {
    fn drop(&mut self) {
        self.manager.release_all(self.id);
    }
}

// =============================================================================
// TESTS
// =============================================================================

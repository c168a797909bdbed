//! Subscriber registry — the live set of delivery targets
//!
//! Entries are keyed by a registration id handed out on `register`, never
//! by transport identity, so removal is cheap and safe to race: the
//! session's own teardown and the broadcaster's reaping may both call
//! `unregister` for the same id and only one of them removes it.

use crate::error::{Result, SentinelError};
use std::collections::BTreeMap;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, MutexGuard, PoisonError};

/// Stable identifier for one registry entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RegistrationId(u64);

impl RegistrationId {
    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for RegistrationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "sub-{}", self.0)
    }
}

/// Concurrent set of subscriber handles
///
/// A single coarse lock makes every mutation mutually exclusive with
/// `snapshot`. Ids are never reused, so a removed entry cannot come back.
pub struct SubscriberRegistry<H> {
    entries: Mutex<BTreeMap<RegistrationId, H>>,
    next_id: AtomicU64,
    capacity: usize,
}

impl<H> SubscriberRegistry<H> {
    /// Create a registry holding at most `capacity` entries
    pub fn new(capacity: usize) -> Self {
        Self {
            entries: Mutex::new(BTreeMap::new()),
            next_id: AtomicU64::new(1),
            capacity,
        }
    }

    // A panic while holding the lock cannot leave the map half-updated,
    // so a poisoned lock is still safe to use.
    fn lock(&self) -> MutexGuard<'_, BTreeMap<RegistrationId, H>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Add a handle, returning the id used to remove it later
    ///
    /// Fails with `SentinelError::Capacity` when the registry is full.
    pub fn register(&self, handle: H) -> Result<RegistrationId> {
        let mut entries = self.lock();
        if entries.len() >= self.capacity {
            return Err(SentinelError::Capacity {
                limit: self.capacity,
            });
        }
        let id = RegistrationId(self.next_id.fetch_add(1, Ordering::Relaxed));
        entries.insert(id, handle);
        drop(entries);

        tracing::debug!(registration = %id, "Subscriber registered");
        Ok(id)
    }

    /// Remove an entry; returns `false` if it was already gone
    pub fn unregister(&self, id: RegistrationId) -> bool {
        let removed = self.lock().remove(&id);
        // Handle is dropped here, outside the lock
        match removed {
            Some(_) => {
                tracing::debug!(registration = %id, "Subscriber unregistered");
                true
            }
            None => false,
        }
    }

    /// Whether an id is still registered
    pub fn contains(&self, id: RegistrationId) -> bool {
        self.lock().contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

impl<H: Clone> SubscriberRegistry<H> {
    /// Point-in-time copy of the current entries, in registration order
    pub fn snapshot(&self) -> Vec<(RegistrationId, H)> {
        self.lock()
            .iter()
            .map(|(id, handle)| (*id, handle.clone()))
            .collect()
    }
}

impl<H> fmt::Debug for SubscriberRegistry<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubscriberRegistry")
            .field("len", &self.len())
            .field("capacity", &self.capacity)
            .finish()
    }
}

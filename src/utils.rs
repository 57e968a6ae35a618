//! Utility functions for the match coordination service

use std::hash::Hash;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};
use uuid::Uuid;

/// Generate a new opaque match ID token
pub fn generate_match_id() -> String {
    Uuid::new_v4().to_string()
}

/// Generate a new unique connection ID
pub fn generate_connection_id() -> Uuid {
    Uuid::new_v4()
}

/// Get the current UTC timestamp
pub fn current_timestamp() -> DateTime<Utc> {
    Utc::now()
}

/// Per-key async mutexes, created on first use.
///
/// Operations that must be serialized for one key (one match, one user) take
/// the key's lock; operations on distinct keys proceed concurrently. There is
/// no global lock anywhere in this type.
pub struct KeyedLocks<K: Eq + Hash + Clone> {
    locks: DashMap<K, Arc<Mutex<()>>>,
}

impl<K: Eq + Hash + Clone> KeyedLocks<K> {
    pub fn new() -> Self {
        Self {
            locks: DashMap::new(),
        }
    }

    /// Acquire the lock for `key`, waiting if another task holds it.
    ///
    /// The dashmap shard guard is released before awaiting, so contention on
    /// one key never blocks lookups of other keys in the same shard.
    pub async fn acquire(&self, key: K) -> OwnedMutexGuard<()> {
        let cell = self.locks.entry(key).or_default().clone();
        cell.lock_owned().await
    }

    /// Drop lock entries no task currently holds or awaits.
    ///
    /// Safe against races with `acquire`: the shard lock inside `retain`
    /// serializes with `entry`, so a cell observed at strong count 1 cannot
    /// gain a new holder while it is being removed.
    pub fn prune(&self) {
        self.locks.retain(|_, cell| Arc::strong_count(cell) > 1);
    }

    /// Number of keys currently tracked (held, awaited, or not yet pruned)
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl<K: Eq + Hash + Clone> Default for KeyedLocks<K> {
    fn default() -> Self {
        Self::new()
    }
}

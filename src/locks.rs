//! Per-account broadcast serialization
//!
//! Two transactions signed by the same account must not be in flight at the
//! same time, or both get built with the same sequence and the chain rejects
//! one of them. Every submission takes the lock of its signer address first.
//!
//! Entries live in a bounded table: once it grows past `max_idle`, locks that
//! nobody holds or waits on are dropped.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Default number of tracked accounts before idle entries are pruned
pub const DEFAULT_MAX_IDLE: usize = 1024;

pub struct CredentialLocks {
    locks: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
    max_idle: usize,
}

impl Default for CredentialLocks {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_IDLE)
    }
}

impl CredentialLocks {
    pub fn new(max_idle: usize) -> Self {
        Self {
            locks: Mutex::new(HashMap::new()),
            max_idle,
        }
    }

    /// Wait for exclusive use of `key` (a signer address)
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let lock = self.entry(key);
        lock.lock_owned().await
    }

    fn entry(&self, key: &str) -> Arc<AsyncMutex<()>> {
        let mut locks = self.locks.lock().unwrap_or_else(|e| e.into_inner());

        if locks.len() >= self.max_idle && !locks.contains_key(key) {
            // Only the table holds an idle lock
            locks.retain(|_, lock| Arc::strong_count(lock) > 1);
        }

        locks
            .entry(key.to_string())
            .or_insert_with(|| Arc::new(AsyncMutex::new(())))
            .clone()
    }

    /// Number of tracked accounts
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

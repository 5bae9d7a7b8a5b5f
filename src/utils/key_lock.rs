//! Per-key async mutual exclusion
//!
//! Serializes the check-then-store upload sequence for one canonical key
//! inside this process. Entries are dropped once nobody holds or waits on them.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyLocks {
    inner: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

/// Held while a key is locked; releases and prunes the entry on drop
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let mutex = {
            let mut map = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            map.entry(key.to_string())
                .or_insert_with(|| Arc::new(AsyncMutex::new(())))
                .clone()
        };

        let guard = mutex.lock_owned().await;
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(guard),
        }
    }

    /// Number of keys currently tracked
    pub fn len(&self) -> usize {
        self.inner.lock().map(|map| map.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        // Release first so the strong count reflects only waiters
        self.guard.take();

        let mut map = self.locks.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(mutex) = map.get(&self.key) {
            // One reference is the map's own; more means someone is waiting
            if Arc::strong_count(mutex) == 1 {
                map.remove(&self.key);
            }
        }
    }
}

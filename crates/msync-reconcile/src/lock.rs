//! Keyed exclusion lock.
//!
//! Process-local: a key is either held or free. `lock` never waits, it
//! either takes the key or reports that someone else holds it. Swapping this
//! for a store-backed lease is required before running more than one
//! instance against the same database.

use dashmap::DashSet;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("key already locked: {0}")]
pub struct LockHeld(pub String);

#[derive(Debug, Default)]
pub struct KeyedLock {
    held: DashSet<String>,
}

impl KeyedLock {
    pub fn new() -> Self {
        Self::default()
    }

    /// Take `key`, or fail immediately if it is held.
    pub fn lock(&self, key: &str) -> Result<(), LockHeld> {
        if self.held.insert(key.to_string()) {
            Ok(())
        } else {
            Err(LockHeld(key.to_string()))
        }
    }

    /// Release `key`. Releasing a free key is a no-op.
    pub fn unlock(&self, key: &str) {
        self.held.remove(key);
    }

    pub fn is_locked(&self, key: &str) -> bool {
        self.held.contains(key)
    }

    pub fn held_count(&self) -> usize {
        self.held.len()
    }

    /// Scoped variant of `lock`: the key is released when the guard drops,
    /// on every exit path.
    pub fn try_guard(self: &Arc<Self>, key: &str) -> Option<KeyGuard> {
        self.lock(key).ok().map(|()| KeyGuard {
            lock: Arc::clone(self),
            key: key.to_string(),
        })
    }
}

#[derive(Debug)]
pub struct KeyGuard {
    lock: Arc<KeyedLock>,
    key: String,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        self.lock.unlock(&self.key);
    }
}

//! Per-key exclusive locks for read-modify-write cycles on storage keys.
//!
//! Storage calls are individually atomic but there is no transaction across
//! a get and the following put. Holders of a [`KeyGuard`] for a key are the
//! only writers of that key in this process. Different keys never contend.
//!
//! Lock entries are created on demand and removed again once nobody holds or
//! waits for them, so the registry does not grow with the number of keys ever
//! touched.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::error::StoreError;

type Slot = Arc<AsyncMutex<()>>;

/// Registry of async mutexes keyed by storage key.
#[derive(Debug, Default)]
pub struct KeyLocks {
    slots: Mutex<HashMap<String, Slot>>,
}

impl KeyLocks {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Wait up to `timeout` for exclusive access to `key`.
    pub async fn acquire(
        self: &Arc<Self>,
        key: &str,
        timeout: Duration,
    ) -> Result<KeyGuard, StoreError> {
        let slot = {
            let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
            slots.entry(key.to_string()).or_default().clone()
        };

        let started = Instant::now();
        match tokio::time::timeout(timeout, slot.lock_owned()).await {
            Ok(guard) => {
                tracing::debug!(
                    key,
                    waited_ms = started.elapsed().as_millis() as u64,
                    "Acquired key lock"
                );
                Ok(KeyGuard {
                    registry: Arc::clone(self),
                    key: key.to_string(),
                    guard: Some(guard),
                })
            }
            Err(_) => {
                self.release_slot(key);
                tracing::warn!(key, timeout_ms = timeout.as_millis() as u64, "Key lock wait timed out");
                Err(StoreError::LockTimeout {
                    key: key.to_string(),
                    waited: timeout,
                })
            }
        }
    }

    /// Number of keys currently held or waited on.
    pub fn active_keys(&self) -> usize {
        self.slots.lock().unwrap_or_else(|e| e.into_inner()).len()
    }

    /// Drop the registry entry when no guard or waiter references it.
    fn release_slot(&self, key: &str) {
        let mut slots = self.slots.lock().unwrap_or_else(|e| e.into_inner());
        if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(key);
        }
    }
}

/// Exclusive access to one key; released on drop.
#[derive(Debug)]
pub struct KeyGuard {
    registry: Arc<KeyLocks>,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyGuard {
    pub fn key(&self) -> &str {
        &self.key
    }
}

impl Drop for KeyGuard {
    fn drop(&mut self) {
        // Unlock first so the strong count reflects only waiters.
        self.guard.take();
        self.registry.release_slot(&self.key);
    }
}

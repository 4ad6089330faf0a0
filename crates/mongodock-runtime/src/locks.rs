//! Per-name lock table.
//!
//! Create and delete for the same deployment name must not interleave.
//! Each name maps to its own async mutex; entries nobody holds or waits on
//! are pruned whenever a new lock is requested.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Guard proving exclusive access to one deployment name.
#[derive(Debug)]
pub struct NameGuard {
    name: String,
    _guard: OwnedMutexGuard<()>,
}

impl NameGuard {
    /// Name this guard protects.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Table of async mutexes keyed by deployment name.
#[derive(Debug, Default)]
pub struct NameLocks {
    table: Mutex<HashMap<String, Arc<AsyncMutex<()>>>>,
}

impl NameLocks {
    /// Creates an empty table.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for exclusive access to `name`.
    pub async fn lock(&self, name: &str) -> NameGuard {
        let mutex = {
            let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
            table.retain(|key, entry| key == name || Arc::strong_count(entry) > 1);
            Arc::clone(table.entry(name.to_string()).or_default())
        };
        let guard = mutex.lock_owned().await;
        tracing::trace!(name, "acquired name lock");
        NameGuard {
            name: name.to_string(),
            _guard: guard,
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }
}

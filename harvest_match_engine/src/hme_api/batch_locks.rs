use std::{
    collections::HashMap,
    sync::{Arc, Mutex, PoisonError},
};

use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

use crate::db_types::BatchId;

type LockMap = Arc<Mutex<HashMap<BatchId, Arc<AsyncMutex<()>>>>>;

/// Keyed async locks, one per batch. Holding a [`BatchLockGuard`] gives the holder exclusive access to that batch
/// within this process. Locks on different batches are independent.
///
/// Entries are removed from the map when the last holder releases a lock with nobody else waiting.
#[derive(Clone, Default)]
pub struct BatchLocks {
    locks: LockMap,
}

impl BatchLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits until no one else holds the lock for `batch_id`, then takes it.
    pub async fn acquire(&self, batch_id: BatchId) -> BatchLockGuard {
        let lock = {
            let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
            Arc::clone(locks.entry(batch_id).or_default())
        };
        let guard = lock.lock_owned().await;
        BatchLockGuard { batch_id, locks: Arc::clone(&self.locks), guard: Some(guard) }
    }

    /// The number of batches that currently have a holder or waiters.
    pub fn len(&self) -> usize {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

pub struct BatchLockGuard {
    batch_id: BatchId,
    locks: LockMap,
    guard: Option<OwnedMutexGuard<()>>,
}

impl BatchLockGuard {
    pub fn batch_id(&self) -> BatchId {
        self.batch_id
    }
}

impl Drop for BatchLockGuard {
    fn drop(&mut self) {
        let mut locks = self.locks.lock().unwrap_or_else(PoisonError::into_inner);
        // One reference lives in the map and one in our guard. Any others belong to waiters.
        let idle = locks.get(&self.batch_id).map(|l| Arc::strong_count(l) <= 2).unwrap_or(false);
        if idle {
            locks.remove(&self.batch_id);
        }
        self.guard.take();
    }
}

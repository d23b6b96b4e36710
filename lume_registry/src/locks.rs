//! Per-key serialization of registry writes.
//!
//! The create path reads the stored entry, decides, then writes. Holding a
//! key's lock across that sequence keeps two concurrent creates for the same
//! key from both deciding against the same stale state. Creates for
//! different keys never wait on each other.

use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::{Mutex, OwnedMutexGuard};

#[derive(Debug, Default)]
pub struct KeyLocks {
    locks: DashMap<String, Arc<Mutex<()>>>,
}

/// Holds the lock for one key until dropped.
#[derive(Debug)]
pub struct KeyGuard<'a> {
    locks: &'a KeyLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl KeyLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Waits for and takes the lock for `key`.
    pub async fn lock(&self, key: &str) -> KeyGuard<'_> {
        // Built before waiting so that a cancelled wait still runs the
        // cleanup in `Drop`.
        let mut guard = KeyGuard {
            locks: self,
            key: key.to_owned(),
            guard: None,
        };
        // The map shard lock is released at the end of this statement,
        // before awaiting the key's own mutex.
        let mutex = self.locks.entry(key.to_owned()).or_default().clone();
        guard.guard = Some(mutex.lock_owned().await);
        guard
    }

    /// Number of keys currently locked or waited on.
    pub fn len(&self) -> usize {
        self.locks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.locks.is_empty()
    }
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        drop(self.guard.take());
        // Only the map itself still references the mutex: nobody holds or
        // waits for this key, so the slot can go.
        self.locks
            .locks
            .remove_if(&self.key, |_, mutex| Arc::strong_count(mutex) == 1);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn test_lock_is_released_and_cleaned_up() {
        let locks = KeyLocks::new();
        {
            let _guard = locks.lock("aa").await;
            assert_eq!(locks.len(), 1);
        }
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_same_key_is_exclusive() {
        let locks = Arc::new(KeyLocks::new());
        let guard = locks.lock("aa").await;

        let contender = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("aa").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_cancelled_waiter_does_not_leak_slot() {
        let locks = Arc::new(KeyLocks::new());
        let holder = locks.lock("aa").await;

        let waiter = {
            let locks = Arc::clone(&locks);
            tokio::spawn(async move {
                let _guard = locks.lock("aa").await;
            })
        };
        tokio::time::sleep(Duration::from_millis(20)).await;

        // The waiter still references the slot, so releasing the holder
        // leaves it in place; the waiter is then cancelled before it runs.
        drop(holder);
        waiter.abort();
        assert!(waiter.await.unwrap_err().is_cancelled());

        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_timed_out_lock_is_cleaned_up() {
        let locks = KeyLocks::new();
        let holder = locks.lock("aa").await;

        let waited = tokio::time::timeout(Duration::from_millis(20), locks.lock("aa")).await;
        assert!(waited.is_err());
        assert_eq!(locks.len(), 1);

        drop(holder);
        assert!(locks.is_empty());
    }

    #[tokio::test]
    async fn test_different_keys_do_not_block() {
        let locks = KeyLocks::new();
        let _a = locks.lock("aa").await;
        let b = tokio::time::timeout(Duration::from_millis(100), locks.lock("bb")).await;
        assert!(b.is_ok());
        assert_eq!(locks.len(), 2);
    }
}

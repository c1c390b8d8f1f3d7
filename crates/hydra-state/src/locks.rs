//! Per-identity async mutual exclusion.
//!
//! Every read-merge-write for one `appId` runs under that id's lock, so two
//! concurrent updates to the same app cannot overwrite each other. Updates
//! to different apps proceed in parallel.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

/// Lazily-created mutex per key.
#[derive(Debug, Default)]
pub struct KeyedLocks {
    slots: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wait for exclusive access to `key`. Released when the guard drops.
    pub async fn acquire(&self, key: &str) -> OwnedMutexGuard<()> {
        let slot = {
            let mut slots = self.slots.lock().await;
            slots.entry(key.to_string()).or_default().clone()
        };
        slot.lock_owned().await
    }

    /// Drop the slot for `key` if nobody holds or awaits it.
    pub async fn forget(&self, key: &str) {
        let mut slots = self.slots.lock().await;
        if slots.get(key).is_some_and(|slot| Arc::strong_count(slot) == 1) {
            slots.remove(key);
        }
    }

    #[cfg(test)]
    async fn len(&self) -> usize {
        self.slots.lock().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;

    #[tokio::test]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let guard = locks.acquire("app").await;

        let contender = {
            let locks = locks.clone();
            tokio::spawn(async move {
                let _guard = locks.acquire("app").await;
            })
        };

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert!(!contender.is_finished());

        drop(guard);
        contender.await.unwrap();
    }

    #[tokio::test]
    async fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.acquire("a").await;
        let _b = tokio::time::timeout(Duration::from_secs(1), locks.acquire("b"))
            .await
            .expect("independent key should not block");
        assert_eq!(locks.len().await, 2);
    }

    #[tokio::test]
    async fn forget_skips_held_slots() {
        let locks = KeyedLocks::new();
        let guard = locks.acquire("app").await;

        locks.forget("app").await;
        assert_eq!(locks.len().await, 1);

        drop(guard);
        locks.forget("app").await;
        assert_eq!(locks.len().await, 0);
    }
}

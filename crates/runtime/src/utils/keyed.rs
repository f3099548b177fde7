//! Per-key async mutual exclusion.
//!
//! A [`KeyedLocks`] hands out one async mutex per key on demand and forgets
//! the key once nobody holds or waits on it, so the table only grows with
//! the number of keys currently in contention.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::{Arc, Mutex as StdMutex, MutexGuard, PoisonError};

use tokio::sync::{Mutex, OwnedMutexGuard};

type Slots<K> = Arc<StdMutex<HashMap<K, Arc<Mutex<()>>>>>;

pub struct KeyedLocks<K> {
    slots: Slots<K>,
}

impl<K> KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    pub fn new() -> Self {
        Self {
            slots: Arc::new(StdMutex::new(HashMap::new())),
        }
    }

    /// Wait until `key` is free and hold it until the guard drops.
    pub async fn lock(&self, key: K) -> KeyedGuard<K> {
        let slot = {
            let mut slots = lock_slots(&self.slots);
            Arc::clone(slots.entry(key.clone()).or_default())
        };
        let guard = slot.lock_owned().await;
        KeyedGuard {
            key,
            slots: Arc::clone(&self.slots),
            guard: Some(guard),
        }
    }

    /// Number of keys currently held or awaited.
    pub fn active(&self) -> usize {
        lock_slots(&self.slots).len()
    }
}

impl<K> Default for KeyedLocks<K>
where
    K: Eq + Hash + Clone,
{
    fn default() -> Self {
        Self::new()
    }
}

// The table only holds plain Arcs, so a panic while it was locked cannot
// leave it inconsistent.
fn lock_slots<K>(slots: &Slots<K>) -> MutexGuard<'_, HashMap<K, Arc<Mutex<()>>>> {
    slots.lock().unwrap_or_else(PoisonError::into_inner)
}

pub struct KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    key: K,
    slots: Slots<K>,
    guard: Option<OwnedMutexGuard<()>>,
}

impl<K> KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    pub fn key(&self) -> &K {
        &self.key
    }
}

impl<K> Drop for KeyedGuard<K>
where
    K: Eq + Hash + Clone,
{
    fn drop(&mut self) {
        drop(self.guard.take());
        let mut slots = lock_slots(&self.slots);
        if let Some(slot) = slots.get(&self.key)
            && Arc::strong_count(slot) == 1
        {
            slots.remove(&self.key);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;

    #[tokio::test]
    async fn entries_are_released() {
        let locks = KeyedLocks::new();
        {
            let _a = locks.lock(1u64).await;
            let _b = locks.lock(2u64).await;
            assert_eq!(locks.active(), 2);
        }
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn same_key_is_exclusive() {
        let locks = Arc::new(KeyedLocks::new());
        let inside = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let tasks: Vec<_> = (0..8)
            .map(|_| {
                let locks = Arc::clone(&locks);
                let inside = Arc::clone(&inside);
                let peak = Arc::clone(&peak);
                tokio::spawn(async move {
                    let _guard = locks.lock("k").await;
                    let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                    peak.fetch_max(now, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_millis(10)).await;
                    inside.fetch_sub(1, Ordering::SeqCst);
                })
            })
            .collect();
        for task in tasks {
            task.await.unwrap();
        }

        assert_eq!(peak.load(Ordering::SeqCst), 1);
        assert_eq!(locks.active(), 0);
    }

    #[tokio::test]
    async fn distinct_keys_do_not_block() {
        let locks = KeyedLocks::new();
        let _a = locks.lock(1u64).await;
        let b = tokio::time::timeout(Duration::from_secs(1), locks.lock(2u64)).await;
        assert!(b.is_ok());
    }
}

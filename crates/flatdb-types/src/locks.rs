use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError, RwLock};

/// Reader/writer lock table keyed by string.
///
/// Each key gets its own `RwLock`, created on first use and dropped again
/// once nobody holds or waits on it. The table mutex is only held while
/// looking up or pruning an entry, never while the caller's closure runs, so
/// operations on different keys never contend.
///
/// The guarded value is `()`: the lock protects a file on disk, not memory,
/// so a poisoned lock carries no broken state and is simply recovered.
#[derive(Default)]
pub struct KeyedLocks {
    table: Mutex<HashMap<String, Arc<RwLock<()>>>>,
}

impl KeyedLocks {
    /// Create an empty lock table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` while holding the shared lock for `key`.
    pub fn with_read<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.acquire(key);
        let result = {
            let _guard = lock.read().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(key, lock);
        result
    }

    /// Run `f` while holding the exclusive lock for `key`.
    pub fn with_write<R>(&self, key: &str, f: impl FnOnce() -> R) -> R {
        let lock = self.acquire(key);
        let result = {
            let _guard = lock.write().unwrap_or_else(PoisonError::into_inner);
            f()
        };
        self.release(key, lock);
        result
    }

    /// Number of keys that currently have a live lock entry.
    pub fn len(&self) -> usize {
        self.table
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    /// Returns `true` if no key is currently locked or awaited.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn acquire(&self, key: &str) -> Arc<RwLock<()>> {
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(table.entry(key.to_string()).or_default())
    }

    fn release(&self, key: &str, lock: Arc<RwLock<()>>) {
        drop(lock);
        let mut table = self.table.lock().unwrap_or_else(PoisonError::into_inner);
        // Only the table's own reference left: nobody holds or waits on it.
        if table.get(key).is_some_and(|l| Arc::strong_count(l) == 1) {
            table.remove(key);
        }
    }
}

impl std::fmt::Debug for KeyedLocks {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyedLocks")
            .field("active_keys", &self.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::thread;
    use std::time::Duration;

    #[test]
    fn entries_are_pruned_after_use() {
        let locks = KeyedLocks::new();
        let value = locks.with_write("a", || 7);
        assert_eq!(value, 7);
        assert!(locks.is_empty());

        locks.with_read("b", || assert_eq!(locks.len(), 1));
        assert!(locks.is_empty());
    }

    #[test]
    fn writers_on_same_key_are_exclusive() {
        let locks = KeyedLocks::new();
        let inside = AtomicUsize::new(0);
        let max_seen = AtomicUsize::new(0);

        thread::scope(|s| {
            for _ in 0..8 {
                s.spawn(|| {
                    locks.with_write("same", || {
                        let now = inside.fetch_add(1, Ordering::SeqCst) + 1;
                        max_seen.fetch_max(now, Ordering::SeqCst);
                        thread::sleep(Duration::from_millis(2));
                        inside.fetch_sub(1, Ordering::SeqCst);
                    });
                });
            }
        });

        assert_eq!(max_seen.load(Ordering::SeqCst), 1);
        assert!(locks.is_empty());
    }

    #[test]
    fn different_keys_do_not_block() {
        let locks = KeyedLocks::new();
        // Holding "a" must not prevent taking "b" on the same thread.
        locks.with_write("a", || {
            locks.with_write("b", || {
                assert_eq!(locks.len(), 2);
            });
        });
        assert!(locks.is_empty());
    }

    #[test]
    fn readers_share() {
        let locks = KeyedLocks::new();
        locks.with_read("k", || {
            locks.with_read("k", || {
                assert_eq!(locks.len(), 1);
            });
        });
    }
}

//! In-memory TTL caches.

use std::collections::{HashMap, VecDeque};
use std::hash::Hash;
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use tokio::time::Instant;

/// Default entry limit for [`TtlCache::bounded`].
pub const DEFAULT_MAX_ENTRIES: usize = 100;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

struct Inner<K, V> {
    entries: HashMap<K, Entry<V>>,
    order: VecDeque<K>,
}

/// Keyed cache with per-entry TTL.
///
/// Expiry is lazy: a stale entry is removed when it is read. When bounded,
/// inserting a new key beyond `max_entries` evicts the oldest inserted key,
/// regardless of how recently it was read (FIFO, not LRU).
pub struct TtlCache<K, V> {
    inner: Mutex<Inner<K, V>>,
    max_entries: Option<usize>,
}

impl<K, V> TtlCache<K, V>
where
    K: Eq + Hash + Clone,
    V: Clone,
{
    /// Creates a cache without an entry limit.
    pub fn unbounded() -> Self {
        Self::with_limit(None)
    }

    /// Creates a cache holding at most `max_entries` keys.
    pub fn bounded(max_entries: usize) -> Self {
        Self::with_limit(Some(max_entries.max(1)))
    }

    fn with_limit(max_entries: Option<usize>) -> Self {
        Self {
            inner: Mutex::new(Inner {
                entries: HashMap::new(),
                order: VecDeque::new(),
            }),
            max_entries,
        }
    }

    /// Returns a fresh value, removing it if it has expired.
    pub fn get(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let expired = match inner.entries.get(key) {
            Some(entry) if Instant::now() < entry.expires_at => return Some(entry.value.clone()),
            Some(_) => true,
            None => false,
        };
        if expired {
            inner.entries.remove(key);
            inner.order.retain(|k| k != key);
        }
        None
    }

    /// Stores a value for `ttl`. Re-inserting a key keeps its FIFO position.
    pub fn insert(&self, key: K, value: V, ttl: Duration) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        let expires_at = Instant::now() + ttl;

        if !inner.entries.contains_key(&key) {
            if let Some(max) = self.max_entries {
                while inner.entries.len() >= max {
                    let Some(oldest) = inner.order.pop_front() else {
                        break;
                    };
                    inner.entries.remove(&oldest);
                }
            }
            inner.order.push_back(key.clone());
        }
        inner.entries.insert(key, Entry { value, expires_at });
    }

    /// Removes a key.
    pub fn remove(&self, key: &K) -> Option<V> {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.order.retain(|k| k != key);
        inner.entries.remove(key).map(|e| e.value)
    }

    /// Removes every entry.
    pub fn clear(&self) {
        let mut inner = self.inner.lock().unwrap_or_else(PoisonError::into_inner);
        inner.entries.clear();
        inner.order.clear();
    }

    /// Number of stored entries, including stale ones not yet read.
    pub fn len(&self) -> usize {
        self.inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len()
    }

    /// Returns true if the cache holds no entries.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K, V> std::fmt::Debug for TtlCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let len = self
            .inner
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .entries
            .len();
        f.debug_struct("TtlCache")
            .field("len", &len)
            .field("max_entries", &self.max_entries)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_lazy_expiry() {
        let cache = TtlCache::unbounded();
        cache.insert("k", 1, Duration::from_millis(50));

        tokio::time::advance(Duration::from_millis(40)).await;
        assert_eq!(cache.get(&"k"), Some(1));

        tokio::time::advance(Duration::from_millis(20)).await;
        assert_eq!(cache.len(), 1);
        assert_eq!(cache.get(&"k"), None);
        assert!(cache.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_fifo_eviction_ignores_access() {
        let cache = TtlCache::bounded(2);
        let ttl = Duration::from_secs(60);
        cache.insert("first", 1, ttl);
        cache.insert("second", 2, ttl);

        // Reading does not refresh the FIFO position.
        assert_eq!(cache.get(&"first"), Some(1));

        cache.insert("third", 3, ttl);
        assert_eq!(cache.get(&"first"), None);
        assert_eq!(cache.get(&"second"), Some(2));
        assert_eq!(cache.get(&"third"), Some(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_reinsert_does_not_evict() {
        let cache = TtlCache::bounded(2);
        let ttl = Duration::from_secs(60);
        cache.insert("a", 1, ttl);
        cache.insert("b", 2, ttl);
        cache.insert("a", 10, ttl);

        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(&"a"), Some(10));
        assert_eq!(cache.get(&"b"), Some(2));
    }
}

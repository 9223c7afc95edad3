//! # TTL Cache
//!
//! In-memory key/value store with per-entry absolute expiry. Entries are
//! invalidated lazily (read-time expiry check) and eagerly (explicit
//! invalidation by key substring, used to scope eviction to one room or
//! one address without tracking exact keys).
//!
//! Not safe for unbounded growth: callers choose short TTLs matching how
//! fast the corresponding on-chain value can legitimately change.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use parking_lot::RwLock;

struct Entry<V> {
    value: V,
    expires_at: Instant,
}

/// Thread-safe TTL cache keyed by string.
///
/// One instance per connected identity; the whole cache is cleared when
/// the active identity changes to prevent cross-identity data leakage.
pub struct TtlCache<V> {
    entries: RwLock<HashMap<String, Entry<V>>>,
}

impl<V: Clone> TtlCache<V> {
    /// Creates an empty cache.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Returns the cached value for `key` if present and not expired.
    ///
    /// A read at or past the expiry instant is a miss and evicts the entry.
    #[must_use]
    pub fn get(&self, key: &str) -> Option<V> {
        {
            let entries = self.entries.read();
            match entries.get(key) {
                Some(entry) if Instant::now() < entry.expires_at => {
                    return Some(entry.value.clone());
                }
                Some(_) => {}
                None => return None,
            }
        }
        // Expired - evict under the write lock.
        self.entries.write().remove(key);
        None
    }

    /// Stores `value` under `key` with the given time-to-live.
    pub fn set(&self, key: impl Into<String>, value: V, ttl: Duration) {
        let entry = Entry {
            value,
            expires_at: Instant::now() + ttl,
        };
        self.entries.write().insert(key.into(), entry);
    }

    /// Whether a live entry exists for `key`.
    #[must_use]
    pub fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Evicts entries.
    ///
    /// With `None` the whole cache is cleared. With `Some(fragment)` every
    /// key containing the fragment is evicted.
    pub fn invalidate(&self, fragment: Option<&str>) {
        let mut entries = self.entries.write();
        match fragment {
            None => entries.clear(),
            Some(fragment) => {
                entries.retain(|key, _| !key.contains(fragment));
            }
        }
    }

    /// Number of stored entries, including not-yet-evicted expired ones.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Whether the cache holds no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

impl<V: Clone> Default for TtlCache<V> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hit_before_expiry() {
        let cache = TtlCache::new();
        cache.set("room:abc", 42u32, Duration::from_secs(60));
        assert_eq!(cache.get("room:abc"), Some(42));
        assert!(cache.has("room:abc"));
    }

    #[test]
    fn test_miss_at_expiry_and_eviction() {
        let cache = TtlCache::new();
        cache.set("room:abc", 42u32, Duration::ZERO);
        assert_eq!(cache.get("room:abc"), None);
        // The expired read also evicted the entry.
        assert_eq!(cache.len(), 0);
    }

    #[test]
    fn test_substring_invalidation() {
        let cache = TtlCache::new();
        let ttl = Duration::from_secs(60);
        cache.set("warrior:alice:1", 1u32, ttl);
        cache.set("warrior:alice:2", 2u32, ttl);
        cache.set("warrior:bob:1", 3u32, ttl);

        cache.invalidate(Some("alice"));

        assert!(!cache.has("warrior:alice:1"));
        assert!(!cache.has("warrior:alice:2"));
        assert!(cache.has("warrior:bob:1"));
    }

    #[test]
    fn test_full_invalidation() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, Duration::from_secs(60));
        cache.set("b", 2u32, Duration::from_secs(60));

        cache.invalidate(None);

        assert!(cache.is_empty());
    }

    #[test]
    fn test_overwrite_refreshes_ttl() {
        let cache = TtlCache::new();
        cache.set("key", 1u32, Duration::ZERO);
        cache.set("key", 2u32, Duration::from_secs(60));
        assert_eq!(cache.get("key"), Some(2));
    }
}

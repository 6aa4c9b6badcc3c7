//! Generic TTL cache store with lazy expiration.
//!
//! Entries carry a creation time and an absolute expiry deadline
//! (`expires_at = created_at + ttl`). Reads past the deadline behave as if
//! the entry does not exist and evict it as a side effect; no background
//! sweep is required for correctness.
//!
//! The store is constructed once at process start and passed by reference to
//! its consumers. It is backed by a sharded concurrent map, so no shard lock
//! is ever held across an await point and callers may freely share it across
//! tasks.

use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;

/// A single cache entry. Read-only after creation; replaced wholesale on
/// overwrite and destroyed on explicit removal or lazy expiry.
#[derive(Debug, Clone)]
struct CacheEntry<V> {
    value: V,
    created_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

/// Snapshot of a live (non-expired) entry, used for cache introspection.
#[derive(Debug, Clone)]
pub struct LiveEntry<V> {
    pub key: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub value: V,
}

/// Key/value store with per-entry time-to-live.
///
/// An entry is fresh while `now <= expires_at`; the first read after the
/// deadline evicts it. `set` always succeeds and unconditionally overwrites.
pub struct TtlCache<V: Clone> {
    entries: DashMap<String, CacheEntry<V>>,
}

impl<V: Clone> TtlCache<V> {
    #[must_use]
    pub fn new() -> Self {
        Self { entries: DashMap::new() }
    }

    /// Stores `value` under `key`, overwriting any existing entry.
    pub fn set(&self, key: &str, value: V, ttl: Duration) {
        let now = Utc::now();
        self.entries.insert(
            key.to_owned(),
            CacheEntry { value, created_at: now, expires_at: now + ttl },
        );
    }

    /// Returns the stored value if present and not expired. An expired entry
    /// is evicted before returning `None`.
    pub fn get(&self, key: &str) -> Option<V> {
        let now = Utc::now();
        // The shard guard must be dropped before the eviction below.
        match self.entries.get(key) {
            Some(entry) if now > entry.expires_at => {}
            Some(entry) => return Some(entry.value.clone()),
            None => return None,
        }
        // Conditional removal: a concurrent overwrite with a fresh deadline
        // must survive this eviction.
        self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        None
    }

    /// Same freshness semantics as [`get`](Self::get), without cloning the
    /// value out.
    pub fn has(&self, key: &str) -> bool {
        let now = Utc::now();
        match self.entries.get(key) {
            Some(entry) if now > entry.expires_at => {}
            Some(_) => return true,
            None => return false,
        }
        self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        false
    }

    /// Removes the entry unconditionally; absent keys are not an error.
    pub fn remove(&self, key: &str) {
        self.entries.remove(key);
    }

    /// Removes all entries.
    pub fn clear(&self) {
        self.entries.clear();
    }

    /// Returns the entry's creation time, applying the same expiration
    /// semantics as [`get`](Self::get).
    pub fn created_at(&self, key: &str) -> Option<DateTime<Utc>> {
        let now = Utc::now();
        match self.entries.get(key) {
            Some(entry) if now > entry.expires_at => {}
            Some(entry) => return Some(entry.created_at),
            None => return None,
        }
        self.entries.remove_if(key, |_, entry| now > entry.expires_at);
        None
    }

    /// Snapshots all live entries for operational introspection.
    ///
    /// The snapshot is collected before any eviction so the iteration never
    /// mutates the map it is walking; expired keys found along the way are
    /// evicted afterwards.
    pub fn live_entries(&self) -> Vec<LiveEntry<V>> {
        let now = Utc::now();
        let mut live = Vec::new();
        let mut expired = Vec::new();

        for entry in &self.entries {
            if now > entry.expires_at {
                expired.push(entry.key().clone());
            } else {
                live.push(LiveEntry {
                    key: entry.key().clone(),
                    created_at: entry.created_at,
                    expires_at: entry.expires_at,
                    value: entry.value.clone(),
                });
            }
        }

        for key in expired {
            self.entries.remove_if(&key, |_, entry| now > entry.expires_at);
        }

        live
    }

    /// Number of entries currently held, including not-yet-evicted expired
    /// ones. Intended for tests and diagnostics.
    #[must_use]
    pub fn raw_len(&self) -> usize {
        self.entries.len()
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

    fn minutes(n: i64) -> Duration {
        Duration::minutes(n)
    }

    #[test]
    fn test_set_and_get() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, minutes(5));

        assert_eq!(cache.get("a"), Some(1));
        assert!(cache.has("a"));
        assert!(cache.created_at("a").is_some());
    }

    #[test]
    fn test_get_absent_key() {
        let cache: TtlCache<u32> = TtlCache::new();
        assert_eq!(cache.get("missing"), None);
        assert!(!cache.has("missing"));
        assert!(cache.created_at("missing").is_none());
    }

    #[test]
    fn test_set_overwrites_existing_entry() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, minutes(5));
        cache.set("a", 2u32, minutes(5));

        assert_eq!(cache.get("a"), Some(2));
        assert_eq!(cache.raw_len(), 1);
    }

    #[test]
    fn test_expired_entry_is_absent_and_evicted() {
        let cache = TtlCache::new();
        // Negative TTL puts the deadline in the past immediately.
        cache.set("a", 1u32, Duration::milliseconds(-1));

        assert_eq!(cache.get("a"), None);
        // The expired read must also have evicted the entry.
        assert_eq!(cache.raw_len(), 0);
        assert!(!cache.has("a"));
    }

    #[test]
    fn test_has_evicts_expired_entry() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, Duration::milliseconds(-1));

        assert!(!cache.has("a"));
        assert_eq!(cache.raw_len(), 0);
    }

    #[test]
    fn test_created_at_applies_expiration() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, Duration::milliseconds(-1));

        assert!(cache.created_at("a").is_none());
        assert_eq!(cache.raw_len(), 0);
    }

    #[test]
    fn test_remove_and_clear() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, minutes(5));
        cache.set("b", 2u32, minutes(5));

        cache.remove("a");
        // Removing an absent key is a no-op.
        cache.remove("a");
        assert_eq!(cache.get("a"), None);
        assert_eq!(cache.get("b"), Some(2));

        cache.clear();
        assert_eq!(cache.get("b"), None);
        assert_eq!(cache.raw_len(), 0);
    }

    #[test]
    fn test_live_entries_skips_and_evicts_expired() {
        let cache = TtlCache::new();
        cache.set("fresh", 1u32, minutes(5));
        cache.set("stale", 2u32, Duration::milliseconds(-1));

        let live = cache.live_entries();
        assert_eq!(live.len(), 1);
        assert_eq!(live[0].key, "fresh");
        assert_eq!(live[0].value, 1);
        assert!(live[0].expires_at > live[0].created_at);

        // The walk evicted the stale entry.
        assert_eq!(cache.raw_len(), 1);
    }

    #[test]
    fn test_overwrite_resets_deadline() {
        let cache = TtlCache::new();
        cache.set("a", 1u32, Duration::milliseconds(-1));
        cache.set("a", 2u32, minutes(5));

        assert_eq!(cache.get("a"), Some(2));
    }
}

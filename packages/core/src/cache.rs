use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;

/// Default time-to-live for cached responses (5 minutes).
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// In-memory cache of clonable values keyed by caller-supplied strings.
///
/// Entries carry their insertion time; freshness is decided per lookup so
/// different callers can apply different TTLs to the same cache. Uses the
/// Tokio clock so paused-time tests can advance it.
#[derive(Debug)]
pub struct KeyedCache<T: Clone> {
    entries: HashMap<String, CacheEntry<T>>,
}

#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    cached_at: Instant,
}

impl<T: Clone> Default for KeyedCache<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Clone> KeyedCache<T> {
    pub fn new() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// Returns the value under `key` only while its age is strictly below
    /// `ttl`. Expired entries are evicted.
    pub fn get_fresh(&mut self, key: &str, ttl: Duration) -> Option<T> {
        let fresh = self
            .entries
            .get(key)
            .map(|entry| entry.cached_at.elapsed() < ttl)?;

        if fresh {
            self.entries.get(key).map(|entry| entry.value.clone())
        } else {
            self.entries.remove(key);
            None
        }
    }

    pub fn insert(&mut self, key: impl Into<String>, value: T) {
        self.entries.insert(
            key.into(),
            CacheEntry {
                value,
                cached_at: Instant::now(),
            },
        );
    }

    pub fn invalidate(&mut self, key: &str) {
        self.entries.remove(key);
    }

    pub fn clear(&mut self) {
        self.entries.clear();
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_none_when_cache_is_empty() {
        let mut cache = KeyedCache::<u64>::new();
        assert!(cache.get_fresh("kpi", DEFAULT_TTL).is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn get_returns_value_when_entry_is_fresh() {
        let mut cache = KeyedCache::new();
        cache.insert("kpi", 42_u64);
        tokio::time::advance(Duration::from_millis(999)).await;

        assert_eq!(cache.get_fresh("kpi", Duration::from_secs(1)), Some(42));
    }

    #[tokio::test(start_paused = true)]
    async fn entry_expires_once_age_reaches_ttl() {
        let mut cache = KeyedCache::new();
        cache.insert("kpi", 42_u64);
        tokio::time::advance(Duration::from_secs(1)).await;

        assert!(cache.get_fresh("kpi", Duration::from_secs(1)).is_none());
        assert!(cache.is_empty(), "expired entry should be evicted");
    }

    #[test]
    fn keys_are_independent() {
        let mut cache = KeyedCache::new();
        cache.insert("a", 1_u64);
        cache.insert("b", 2_u64);
        cache.invalidate("a");

        assert!(cache.get_fresh("a", DEFAULT_TTL).is_none());
        assert_eq!(cache.get_fresh("b", DEFAULT_TTL), Some(2));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn clear_drops_everything() {
        let mut cache = KeyedCache::new();
        cache.insert("a", 1_u64);
        cache.insert("b", 2_u64);
        cache.clear();
        assert!(cache.is_empty());
    }
}

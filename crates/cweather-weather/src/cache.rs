//! In-memory response cache with a fixed time-to-live.

use parking_lot::RwLock;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Default time-to-live of a cached response.
pub const DEFAULT_TTL: Duration = Duration::from_secs(300);
/// Default number of locations kept before eviction kicks in.
pub const DEFAULT_MAX_ENTRIES: usize = 1024;

#[derive(Debug)]
struct CacheEntry {
    value: String,
    /// `None` when `now + ttl` does not fit in an `Instant`.
    expires_at: Option<Instant>,
}

impl CacheEntry {
    fn is_live(&self, now: Instant) -> bool {
        self.expires_at.map_or(true, |at| now < at)
    }
}

/// Location-keyed cache of upstream response bodies.
///
/// Keys are opaque and case-sensitive. An expired entry is indistinguishable
/// from a missing one. Safe to share between concurrent handlers.
#[derive(Debug)]
pub struct ResponseCache {
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self::new(ttl, DEFAULT_MAX_ENTRIES)
    }

    /// Cached value for `key`, if present and not expired.
    pub fn get(&self, key: &str) -> Option<String> {
        self.get_at(key, Instant::now())
    }

    /// Insert or replace the value for `key`, expiring one TTL from now.
    pub fn add(&self, key: impl Into<String>, value: impl Into<String>) {
        self.add_at(key.into(), value.into(), Instant::now());
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Number of stored entries, including expired ones not yet evicted.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn get_at(&self, key: &str, now: Instant) -> Option<String> {
        self.entries
            .read()
            .get(key)
            .filter(|entry| entry.is_live(now))
            .map(|entry| entry.value.clone())
    }

    fn add_at(&self, key: String, value: String, now: Instant) {
        let mut entries = self.entries.write();

        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            entries.retain(|_, entry| entry.is_live(now));

            if entries.len() >= self.max_entries {
                // Evict whichever entry would expire first.
                let oldest = entries
                    .iter()
                    .min_by_key(|(_, entry)| (entry.expires_at.is_none(), entry.expires_at))
                    .map(|(k, _)| k.clone());
                if let Some(oldest) = oldest {
                    tracing::debug!("Cache full, evicting {}", oldest);
                    entries.remove(&oldest);
                }
            }
        }

        entries.insert(
            key,
            CacheEntry {
                value,
                expires_at: now.checked_add(self.ttl),
            },
        );
    }
}

impl Default for ResponseCache {
    fn default() -> Self {
        Self::new(DEFAULT_TTL, DEFAULT_MAX_ENTRIES)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_add_then_get() {
        let cache = ResponseCache::default();
        cache.add("Denver", r#"{"temp":280.1}"#);
        assert_eq!(cache.get("Denver").as_deref(), Some(r#"{"temp":280.1}"#));
    }

    #[test]
    fn test_missing_key_is_absent() {
        let cache = ResponseCache::default();
        assert!(cache.get("Denver").is_none());
        assert!(cache.is_empty());
    }

    #[test]
    fn test_entry_expires_after_ttl() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(300));
        let now = Instant::now();
        cache.add_at("Denver".into(), "v".into(), now);

        assert_eq!(cache.get_at("Denver", now).as_deref(), Some("v"));
        assert_eq!(
            cache.get_at("Denver", now + Duration::from_secs(299)).as_deref(),
            Some("v")
        );
        assert!(cache.get_at("Denver", now + Duration::from_secs(300)).is_none());
        assert!(cache.get_at("Denver", now + Duration::from_secs(3600)).is_none());
    }

    #[test]
    fn test_entry_expires_in_real_time() {
        let cache = ResponseCache::with_ttl(Duration::from_millis(30));
        cache.add("Denver", "v");
        assert_eq!(cache.get("Denver").as_deref(), Some("v"));

        std::thread::sleep(Duration::from_millis(60));
        assert!(cache.get("Denver").is_none());
    }

    #[test]
    fn test_zero_ttl_never_serves() {
        let cache = ResponseCache::with_ttl(Duration::ZERO);
        cache.add("Denver", "v");
        assert!(cache.get("Denver").is_none());
    }

    #[test]
    fn test_overwrite_returns_latest() {
        let cache = ResponseCache::default();
        cache.add("Denver", "v1");
        cache.add("Denver", "v2");
        assert_eq!(cache.get("Denver").as_deref(), Some("v2"));
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn test_overwrite_refreshes_expiry() {
        let cache = ResponseCache::with_ttl(Duration::from_secs(60));
        let now = Instant::now();
        cache.add_at("Denver".into(), "v1".into(), now);
        cache.add_at("Denver".into(), "v2".into(), now + Duration::from_secs(50));

        assert_eq!(
            cache.get_at("Denver", now + Duration::from_secs(90)).as_deref(),
            Some("v2")
        );
    }

    #[test]
    fn test_keys_are_isolated() {
        let cache = ResponseCache::default();
        cache.add("Denver", "v1");
        assert!(cache.get("Paris").is_none());
        cache.add("Paris", "v2");
        assert_eq!(cache.get("Denver").as_deref(), Some("v1"));
        assert_eq!(cache.get("Paris").as_deref(), Some("v2"));
    }

    #[test]
    fn test_keys_are_case_sensitive() {
        let cache = ResponseCache::default();
        cache.add("Denver", "v1");
        assert!(cache.get("denver").is_none());
    }

    #[test]
    fn test_full_cache_evicts_expired_first() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        cache.add_at("a".into(), "1".into(), now);
        cache.add_at("b".into(), "2".into(), now + Duration::from_secs(30));

        // "a" has expired by now, "b" is still live.
        let later = now + Duration::from_secs(70);
        cache.add_at("c".into(), "3".into(), later);

        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", later).is_none());
        assert_eq!(cache.get_at("b", later).as_deref(), Some("2"));
        assert_eq!(cache.get_at("c", later).as_deref(), Some("3"));
    }

    #[test]
    fn test_full_cache_evicts_soonest_expiry() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        let now = Instant::now();
        cache.add_at("a".into(), "1".into(), now);
        cache.add_at("b".into(), "2".into(), now + Duration::from_secs(10));
        cache.add_at("c".into(), "3".into(), now + Duration::from_secs(20));

        let at = now + Duration::from_secs(20);
        assert_eq!(cache.len(), 2);
        assert!(cache.get_at("a", at).is_none());
        assert_eq!(cache.get_at("b", at).as_deref(), Some("2"));
        assert_eq!(cache.get_at("c", at).as_deref(), Some("3"));
    }

    #[test]
    fn test_replacing_existing_key_does_not_evict() {
        let cache = ResponseCache::new(Duration::from_secs(60), 2);
        cache.add("a", "1");
        cache.add("b", "2");
        cache.add("a", "3");
        assert_eq!(cache.get("a").as_deref(), Some("3"));
        assert_eq!(cache.get("b").as_deref(), Some("2"));
    }

    #[test]
    fn test_concurrent_access() {
        let cache = Arc::new(ResponseCache::default());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let cache = cache.clone();
                std::thread::spawn(move || {
                    for j in 0..100 {
                        let key = format!("city-{}", j % 10);
                        cache.add(key.clone(), format!("{}-{}", i, j));
                        assert!(cache.get(&key).is_some());
                    }
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(cache.len(), 10);
    }
}

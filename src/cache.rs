//! Signed-URL cache with TTL-based invalidation.
//!
//! Provider-issued cover/thumbnail URLs are signed and expire, so they are
//! cached for a window well inside their validity period and re-fetched
//! afterwards. Play URLs are deliberately NOT cached here: their 1-hour
//! validity window is shorter than any staleness a cache policy would
//! tolerate, so the resolver fetches them fresh on every request.
//!
//! Expired entries are treated as absent and dropped lazily on read; there
//! is no background sweep. The key space is one key per active asset, so
//! unbounded growth is not a concern.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::debug;

/// Default TTL for cached URLs (30 minutes).
const DEFAULT_TTL: Duration = Duration::from_secs(30 * 60);

#[derive(Clone, Debug)]
struct CachedUrl {
    value: String,
    issued_at: Instant,
}

/// Thread-safe URL cache, constructed once per process and injected into
/// the playback resolver. Benign get/put races are tolerated: a concurrent
/// miss costs one redundant provider call, nothing more.
#[derive(Clone, Debug)]
pub struct UrlCache {
    entries: Arc<DashMap<String, CachedUrl>>,
    ttl: Duration,
}

/// Cache key for a remote asset's thumbnail URL.
pub fn thumbnail_key(remote_asset_id: &str) -> String {
    format!("thumbnail:{remote_asset_id}")
}

impl UrlCache {
    /// Create a cache with the default 30-minute TTL.
    pub fn new() -> Self {
        Self::with_ttl(DEFAULT_TTL)
    }

    /// Create a cache with a custom TTL. Used by tests.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(DashMap::new()),
            ttl,
        }
    }

    /// Get a cached URL if present and fresh.
    pub fn get(&self, key: &str) -> Option<String> {
        if let Some(entry) = self.entries.get(key) {
            if entry.issued_at.elapsed() < self.ttl {
                debug!("URL cache HIT for {}", key);
                return Some(entry.value.clone());
            }
            // Stale — drop the read guard before removing
            drop(entry);
            self.entries.remove(key);
        }
        debug!("URL cache MISS for {}", key);
        None
    }

    /// Store a URL, unconditionally overwriting any prior entry.
    pub fn put(&self, key: &str, value: String) {
        self.entries.insert(
            key.to_string(),
            CachedUrl {
                value,
                issued_at: Instant::now(),
            },
        );
    }

    /// Insert an entry backdated by `age`, so tests can probe the real
    /// TTL boundary without sleeping.
    #[cfg(test)]
    fn put_with_age(&self, key: &str, value: String, age: Duration) {
        self.entries.insert(
            key.to_string(),
            CachedUrl {
                value,
                issued_at: Instant::now() - age,
            },
        );
    }
}

impl Default for UrlCache {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hit_within_ttl() {
        let cache = UrlCache::new();
        cache.put("thumbnail:v1", "https://cdn.example.com/t1.jpg".to_string());

        assert_eq!(
            cache.get("thumbnail:v1"),
            Some("https://cdn.example.com/t1.jpg".to_string())
        );
    }

    #[test]
    fn miss_for_unknown_key() {
        let cache = UrlCache::new();
        assert_eq!(cache.get("thumbnail:nope"), None);
    }

    #[test]
    fn miss_after_ttl() {
        let cache = UrlCache::with_ttl(Duration::from_millis(1));
        cache.put("thumbnail:v1", "old".to_string());

        std::thread::sleep(Duration::from_millis(5));

        assert_eq!(
            cache.get("thumbnail:v1"),
            None,
            "Entry should be stale after TTL"
        );
    }

    #[test]
    fn default_ttl_boundary() {
        let cache = UrlCache::new();

        // 31 minutes old is past the 30-minute default TTL
        cache.put_with_age(
            "thumbnail:stale",
            "old".to_string(),
            DEFAULT_TTL + Duration::from_secs(60),
        );
        assert_eq!(cache.get("thumbnail:stale"), None);

        // 29 minutes old is still inside it
        cache.put_with_age(
            "thumbnail:fresh",
            "current".to_string(),
            DEFAULT_TTL - Duration::from_secs(60),
        );
        assert_eq!(cache.get("thumbnail:fresh"), Some("current".to_string()));
    }

    #[test]
    fn put_overwrites_and_refreshes() {
        let cache = UrlCache::new();
        cache.put("thumbnail:v1", "old".to_string());
        cache.put("thumbnail:v1", "new".to_string());

        assert_eq!(cache.get("thumbnail:v1"), Some("new".to_string()));
    }

    #[test]
    fn thumbnail_key_format() {
        assert_eq!(thumbnail_key("abc123"), "thumbnail:abc123");
    }
}

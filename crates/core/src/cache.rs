// crates/core/src/cache.rs
//! Cache-through store for external provider data.
//!
//! Entries are `(value, stored_at)` pairs keyed by string. A fetch goes
//! through [`TtlCache::get_or_fetch`]: an unexpired entry is returned as-is,
//! otherwise the fetch closure runs and a successful result is cached before
//! being returned. Optionally persists to a JSON file so cached provider data
//! survives restarts; expired entries are pruned on load.

use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, warn};

/// Default entry lifetime: 12 hours.
pub const DEFAULT_TTL: Duration = Duration::from_secs(43_200);

#[derive(Debug, Clone, Serialize, Deserialize)]
struct Entry {
    value: Value,
    /// Unix seconds at which the value was stored.
    stored_at: u64,
}

/// Key → `(value, stored_at)` map with per-read TTL checks.
#[derive(Debug, Clone)]
pub struct TtlCache {
    entries: Arc<Mutex<HashMap<String, Entry>>>,
    file: Option<PathBuf>,
    ttl: Duration,
}

impl TtlCache {
    /// In-memory cache with the given default TTL.
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Arc::new(Mutex::new(HashMap::new())),
            file: None,
            ttl,
        }
    }

    /// File-backed cache. Loads any existing file, dropping entries older
    /// than `ttl`; unreadable files start empty.
    pub fn with_file(path: impl Into<PathBuf>, ttl: Duration) -> Self {
        let path = path.into();
        let mut map = HashMap::new();
        if let Ok(raw) = std::fs::read_to_string(&path) {
            match serde_json::from_str::<HashMap<String, Entry>>(&raw) {
                Ok(loaded) => {
                    let now = now_secs();
                    map = loaded
                        .into_iter()
                        .filter(|(_, e)| now.saturating_sub(e.stored_at) < ttl.as_secs())
                        .collect();
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Cache file unreadable, starting empty");
                }
            }
        }
        Self {
            entries: Arc::new(Mutex::new(map)),
            file: Some(path),
            ttl,
        }
    }

    /// The cache's default TTL.
    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// A panic while holding the lock must not take the cache down with it;
    /// the map stays usable, so recover the guard from a poisoned mutex.
    fn entries(&self) -> MutexGuard<'_, HashMap<String, Entry>> {
        self.entries.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Return the cached value for `key` if present and younger than `ttl`.
    pub fn get<T: DeserializeOwned>(&self, key: &str, ttl: Duration) -> Option<T> {
        let entries = self.entries();
        let entry = entries.get(key)?;
        if now_secs().saturating_sub(entry.stored_at) >= ttl.as_secs() {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    /// Store a value under `key`, stamped with the current time.
    pub fn put<T: Serialize>(&self, key: &str, value: &T) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                warn!(key, error = %e, "Failed to serialize cache entry");
                return;
            }
        };
        self.put_entry(key, value, now_secs());
    }

    /// Cache-through read: an unexpired entry short-circuits; otherwise
    /// `fetch` runs and a `Some` result is cached before being returned.
    /// A `None` fetch result is returned as-is and caches nothing; the
    /// caller decides how to degrade.
    pub async fn get_or_fetch<T, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Option<T>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Option<T>>,
    {
        if let Some(cached) = self.get::<T>(key, ttl) {
            debug!(key, "Cache hit");
            return Some(cached);
        }

        debug!(key, "Cache miss or expired, fetching");
        let fetched = fetch().await?;
        self.put(key, &fetched);
        Some(fetched)
    }

    /// Drop one entry (e.g. an access token known to be stale).
    pub fn invalidate(&self, key: &str) {
        self.entries().remove(key);
        self.save();
    }

    fn put_entry(&self, key: &str, value: Value, stored_at: u64) {
        self.entries()
            .insert(key.to_string(), Entry { value, stored_at });
        self.save();
    }

    fn save(&self) {
        let Some(path) = &self.file else { return };
        let raw = {
            let entries = self.entries();
            match serde_json::to_string_pretty(&*entries) {
                Ok(raw) => raw,
                Err(e) => {
                    warn!(error = %e, "Failed to serialize cache file");
                    return;
                }
            }
        };
        if let Some(parent) = path.parent() {
            let _ = std::fs::create_dir_all(parent);
        }
        if let Err(e) = std::fs::write(path, raw) {
            warn!(path = %path.display(), error = %e, "Failed to write cache file");
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const HOUR: Duration = Duration::from_secs(3600);

    #[tokio::test]
    async fn test_fetch_populates_cache() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let value = cache
            .get_or_fetch("ytd", HOUR, || async { Some(41.5f64) })
            .await;
        assert_eq!(value, Some(41.5));
        assert_eq!(cache.get::<f64>("ytd", HOUR), Some(41.5));
    }

    #[tokio::test]
    async fn test_unexpired_entry_skips_fetch() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let calls = AtomicUsize::new(0);

        for _ in 0..3 {
            let got = cache
                .get_or_fetch("stats", HOUR, || async {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Some("fresh".to_string())
                })
                .await;
            assert_eq!(got.as_deref(), Some("fresh"));
        }
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_expired_entry_refetches() {
        let cache = TtlCache::new(DEFAULT_TTL);
        // Backdate an entry by 13 hours.
        cache.put_entry(
            "stats",
            serde_json::json!("stale"),
            now_secs() - 13 * 3600,
        );

        let got = cache
            .get_or_fetch("stats", DEFAULT_TTL, || async { Some("fresh".to_string()) })
            .await;
        assert_eq!(got.as_deref(), Some("fresh"));
    }

    #[tokio::test]
    async fn test_within_ttl_returns_cached_unchanged() {
        let cache = TtlCache::new(DEFAULT_TTL);
        // Entry stored one hour ago is well within the 12h window.
        cache.put_entry("stats", serde_json::json!(127), now_secs() - 3600);

        let got = cache
            .get_or_fetch("stats", DEFAULT_TTL, || async { Some(999i64) })
            .await;
        assert_eq!(got, Some(127));
    }

    #[tokio::test]
    async fn test_failed_fetch_caches_nothing() {
        let cache = TtlCache::new(DEFAULT_TTL);
        let got: Option<String> = cache.get_or_fetch("k", HOUR, || async { None }).await;
        assert!(got.is_none());
        assert!(cache.get::<String>("k", HOUR).is_none());
    }

    #[test]
    fn test_poisoned_lock_recovers() {
        let cache = TtlCache::new(DEFAULT_TTL);
        cache.put("ytd", &2450.5f64);

        let entries = Arc::clone(&cache.entries);
        let _ = std::thread::spawn(move || {
            let _guard = entries.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        assert_eq!(cache.get::<f64>("ytd", HOUR), Some(2450.5));
        cache.put("count", &127i64);
        assert_eq!(cache.get::<i64>("count", HOUR), Some(127));
    }

    #[tokio::test]
    async fn test_invalidate_drops_entry() {
        let cache = TtlCache::new(DEFAULT_TTL);
        cache.put("token", &"abc".to_string());
        cache.invalidate("token");
        assert!(cache.get::<String>("token", HOUR).is_none());
    }

    #[test]
    fn test_file_round_trip() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("cache.json");

        let cache = TtlCache::with_file(&path, DEFAULT_TTL);
        cache.put("ytd", &2450.5f64);

        let reopened = TtlCache::with_file(&path, DEFAULT_TTL);
        assert_eq!(reopened.get::<f64>("ytd", DEFAULT_TTL), Some(2450.5));
    }

    #[test]
    fn test_expired_entries_pruned_on_load() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("cache.json");

        let cache = TtlCache::with_file(&path, DEFAULT_TTL);
        cache.put_entry("old", serde_json::json!(1), now_secs() - 13 * 3600);
        cache.put_entry("new", serde_json::json!(2), now_secs());

        let reopened = TtlCache::with_file(&path, DEFAULT_TTL);
        assert!(reopened.get::<i64>("old", DEFAULT_TTL).is_none());
        assert_eq!(reopened.get::<i64>("new", DEFAULT_TTL), Some(2));
    }

    #[test]
    fn test_corrupt_file_starts_empty() {
        let tmp = tempfile::tempdir().expect("temp dir");
        let path = tmp.path().join("cache.json");
        std::fs::write(&path, "][").unwrap();

        let cache = TtlCache::with_file(&path, DEFAULT_TTL);
        assert!(cache.get::<i64>("anything", DEFAULT_TTL).is_none());
    }
}

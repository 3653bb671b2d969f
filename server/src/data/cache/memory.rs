//! In-memory cache implementation using moka + dashmap
//!
//! Uses moka for the main cache with TinyLFU eviction and dashmap for the
//! sliding-window stores (rate limiting).

use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use moka::Expiry;
use moka::future::Cache;
use parking_lot::Mutex;

use super::backend::{CacheBackend, WindowSurvey};
use super::error::CacheError;
use crate::core::constants::CACHE_MAX_ENTRIES;

/// Cache entry with data and metadata
#[derive(Clone)]
struct CacheEntry {
    data: Vec<u8>,
    ttl: Option<Duration>,
}

/// Per-entry expiry tracking for variable TTLs
struct VariableTtlExpiry;

impl Expiry<String, CacheEntry> for VariableTtlExpiry {
    fn expire_after_create(
        &self,
        _key: &String,
        value: &CacheEntry,
        _created_at: Instant,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_update(
        &self,
        _key: &String,
        value: &CacheEntry,
        _updated_at: Instant,
        _duration_until_expiry: Option<Duration>,
    ) -> Option<Duration> {
        value.ttl
    }

    fn expire_after_read(
        &self,
        _key: &String,
        _value: &CacheEntry,
        _read_at: Instant,
        duration_until_expiry: Option<Duration>,
        _last_modified_at: Instant,
    ) -> Option<Duration> {
        duration_until_expiry
    }
}

/// Sliding-window entry: (score ms, member) pairs sorted by score
struct WindowEntry {
    members: Mutex<Vec<(i64, String)>>,
    expires_at: Mutex<Instant>,
}

/// In-memory cache implementation
pub struct InMemoryCache {
    cache: Cache<String, CacheEntry>,
    windows: DashMap<String, WindowEntry>,
}

impl InMemoryCache {
    pub fn new() -> Self {
        let cache = Cache::builder()
            .max_capacity(CACHE_MAX_ENTRIES)
            .initial_capacity((CACHE_MAX_ENTRIES as usize / 4).min(10_000))
            .expire_after(VariableTtlExpiry)
            .build();

        Self {
            cache,
            windows: DashMap::new(),
        }
    }

    /// Drop windows whose expiry has lapsed
    fn cleanup_expired_windows(&self) {
        let now = Instant::now();
        self.windows.retain(|_, entry| now < *entry.expires_at.lock());
    }
}

impl Default for InMemoryCache {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CacheBackend for InMemoryCache {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        Ok(self.cache.get(key).await.map(|entry| entry.data.clone()))
    }

    async fn set(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let entry = CacheEntry { data: value, ttl };
        self.cache.insert(key.to_string(), entry).await;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        let existed = self.cache.contains_key(key);
        self.cache.invalidate(key).await;
        Ok(existed)
    }

    async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        Ok(self.cache.contains_key(key))
    }

    async fn window_record(
        &self,
        key: &str,
        members: &[(i64, String)],
        expiry: Duration,
    ) -> Result<(), CacheError> {
        self.cleanup_expired_windows();

        let entry = self.windows.entry(key.to_string()).or_insert_with(|| WindowEntry {
            members: Mutex::new(Vec::new()),
            expires_at: Mutex::new(Instant::now() + expiry),
        });

        {
            let mut list = entry.members.lock();
            for (score, member) in members {
                let pos = list.partition_point(|(s, _)| s <= score);
                list.insert(pos, (*score, member.clone()));
            }
        }
        *entry.expires_at.lock() = Instant::now() + expiry;
        Ok(())
    }

    async fn window_survey(&self, key: &str, cutoff_ms: i64) -> Result<WindowSurvey, CacheError> {
        let Some(entry) = self.windows.get(key) else {
            return Ok(WindowSurvey {
                count: 0,
                oldest_ms: None,
            });
        };

        if Instant::now() >= *entry.expires_at.lock() {
            drop(entry);
            self.windows.remove(key);
            return Ok(WindowSurvey {
                count: 0,
                oldest_ms: None,
            });
        }

        let mut list = entry.members.lock();
        let evict_to = list.partition_point(|(s, _)| *s < cutoff_ms);
        list.drain(..evict_to);

        Ok(WindowSurvey {
            count: list.len() as u64,
            oldest_ms: list.first().map(|(s, _)| *s),
        })
    }

    async fn health_check(&self) -> Result<(), CacheError> {
        Ok(())
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_get_set_delete() {
        let cache = InMemoryCache::new();
        cache.set("k", b"v".to_vec(), None).await.unwrap();
        assert_eq!(cache.get("k").await.unwrap(), Some(b"v".to_vec()));
        assert!(cache.delete("k").await.unwrap());
        assert_eq!(cache.get("k").await.unwrap(), None);
        assert!(!cache.delete("k").await.unwrap());
    }

    #[tokio::test]
    async fn test_window_record_and_survey() {
        let cache = InMemoryCache::new();
        let expiry = Duration::from_secs(60);
        cache
            .window_record(
                "w",
                &[(100, "100-a".into()), (200, "200-a".into()), (50, "50-a".into())],
                expiry,
            )
            .await
            .unwrap();

        // Nothing evicted below cutoff 0
        let survey = cache.window_survey("w", 0).await.unwrap();
        assert_eq!(survey.count, 3);
        assert_eq!(survey.oldest_ms, Some(50));

        // Entries below 150 evicted
        let survey = cache.window_survey("w", 150).await.unwrap();
        assert_eq!(survey.count, 1);
        assert_eq!(survey.oldest_ms, Some(200));
    }

    #[tokio::test]
    async fn test_window_survey_missing_key() {
        let cache = InMemoryCache::new();
        let survey = cache.window_survey("absent", 0).await.unwrap();
        assert_eq!(survey.count, 0);
        assert_eq!(survey.oldest_ms, None);
    }
}

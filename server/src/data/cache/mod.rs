//! Cache module
//!
//! Provides caching infrastructure with pluggable backends:
//! - In-memory (default) - uses moka + dashmap
//! - Redis (optional) - uses deadpool-redis
//!
//! Also provides the sliding-window rate limiter built on the backend.

mod backend;
mod error;
mod key;
mod memory;
pub mod rate_limiter;
mod redis;

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use serde::de::DeserializeOwned;

pub use backend::{CacheBackend, WindowSurvey};
pub use error::CacheError;
pub use key::CacheKey;
pub use rate_limiter::{RateLimitDecision, RateLimiter};

use memory::InMemoryCache;

/// Cache service providing typed access to the cache backend
///
/// Wraps the underlying cache backend and provides:
/// - Raw bytes API for flexibility
/// - Typed API using MessagePack serialization
pub struct CacheService {
    backend: Arc<dyn CacheBackend>,
}

impl std::fmt::Debug for CacheService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CacheService")
            .field("backend", &self.backend.backend_name())
            .finish()
    }
}

impl CacheService {
    /// Create a new cache service; a Redis URL selects the Redis backend,
    /// otherwise the in-memory backend is used
    pub async fn new(redis_url: Option<&str>) -> Result<Self, CacheError> {
        let backend: Arc<dyn CacheBackend> = match redis_url {
            Some(url) => Arc::new(redis::RedisCache::new(url).await?),
            None => {
                tracing::debug!("Initializing in-memory cache");
                Arc::new(InMemoryCache::new())
            }
        };

        Ok(Self { backend })
    }

    /// In-memory cache service for tests
    #[cfg(test)]
    pub fn memory_for_test() -> Self {
        Self {
            backend: Arc::new(InMemoryCache::new()),
        }
    }

    /// Get the backend name
    pub fn backend_name(&self) -> &'static str {
        self.backend.backend_name()
    }

    // =========================================================================
    // Raw bytes API
    // =========================================================================

    pub async fn get_raw(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError> {
        self.backend.get(key).await
    }

    pub async fn set_raw(
        &self,
        key: &str,
        value: Vec<u8>,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        self.backend.set(key, value, ttl).await
    }

    // =========================================================================
    // Typed API (serde)
    // =========================================================================

    /// Get a typed value from cache (MessagePack)
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, CacheError> {
        match self.get_raw(key).await? {
            Some(bytes) => {
                let value = rmp_serde::from_slice(&bytes)
                    .map_err(|e| CacheError::Serialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Set a typed value in cache (MessagePack)
    pub async fn set<T: Serialize>(
        &self,
        key: &str,
        value: &T,
        ttl: Option<Duration>,
    ) -> Result<(), CacheError> {
        let bytes =
            rmp_serde::to_vec(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        self.set_raw(key, bytes, ttl).await
    }

    // =========================================================================
    // Other operations
    // =========================================================================

    pub async fn delete(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.delete(key).await
    }

    pub async fn exists(&self, key: &str) -> Result<bool, CacheError> {
        self.backend.exists(key).await
    }

    /// Sliding-window insert (see `CacheBackend::window_record`)
    pub async fn window_record(
        &self,
        key: &str,
        members: &[(i64, String)],
        expiry: Duration,
    ) -> Result<(), CacheError> {
        self.backend.window_record(key, members, expiry).await
    }

    /// Sliding-window evict + count (see `CacheBackend::window_survey`)
    pub async fn window_survey(&self, key: &str, cutoff_ms: i64) -> Result<WindowSurvey, CacheError> {
        self.backend.window_survey(key, cutoff_ms).await
    }

    pub async fn health_check(&self) -> Result<(), CacheError> {
        self.backend.health_check().await
    }
}

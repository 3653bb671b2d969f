//! Cache backend trait definition

use std::time::Duration;

use async_trait::async_trait;

use super::error::CacheError;

/// Snapshot of a sliding window after eviction
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowSurvey {
    /// Entries still inside the window
    pub count: u64,
    /// Score (epoch ms) of the oldest surviving entry
    pub oldest_ms: Option<i64>,
}

/// Cache backend trait
///
/// Defines the interface for cache implementations. Both in-memory and
/// Redis backends implement this trait.
///
/// # Consistency Notes
///
/// Operations on individual keys are atomic, but return values of some
/// operations (like `delete` and `exists`) may be stale in concurrent
/// scenarios. This is acceptable for cache use cases.
#[async_trait]
pub trait CacheBackend: Send + Sync {
    /// Get a value from the cache
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, CacheError>;

    /// Set a value in the cache with optional TTL
    async fn set(&self, key: &str, value: Vec<u8>, ttl: Option<Duration>)
    -> Result<(), CacheError>;

    /// Delete a key from the cache
    ///
    /// Returns `true` if the key existed before deletion. Best-effort under
    /// concurrent access.
    async fn delete(&self, key: &str) -> Result<bool, CacheError>;

    /// Check if a key exists in the cache
    async fn exists(&self, key: &str) -> Result<bool, CacheError>;

    /// Add timestamped members to a sliding-window key and refresh its expiry.
    ///
    /// Members must be unique within the key (callers append disambiguating
    /// suffixes); the score is the member's epoch-ms timestamp.
    async fn window_record(
        &self,
        key: &str,
        members: &[(i64, String)],
        expiry: Duration,
    ) -> Result<(), CacheError>;

    /// Evict window members scored strictly below `cutoff_ms`, then report
    /// the surviving count and the oldest surviving score.
    async fn window_survey(&self, key: &str, cutoff_ms: i64) -> Result<WindowSurvey, CacheError>;

    /// Health check (validates connection)
    async fn health_check(&self) -> Result<(), CacheError>;

    /// Backend name for debugging/logging
    fn backend_name(&self) -> &'static str;
}

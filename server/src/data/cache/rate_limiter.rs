//! Per-organisation sliding-window rate limiter
//!
//! Span ingestion quotas use a one-hour sliding window stored in the cache
//! backend (a sorted set under Redis, an ordered list in memory). The check
//! evicts entries older than the window, counts the remainder, and compares
//! against the organisation's effective limit.
//!
//! # Availability over precision
//!
//! If the backing store is unreachable, `check` returns `None` and the
//! caller proceeds. A tenant briefly exceeding quota is preferable to
//! dropping ingestion while the store is down.

use std::sync::Arc;
use std::time::Duration;

use rand::RngCore;

use super::CacheService;
use super::key::CacheKey;
use crate::core::constants::{RATE_LIMIT_KEY_EXPIRY_SECS, RATE_LIMIT_WINDOW_SECS};
use crate::utils::time::now_ms;

/// Outcome of a rate-limit check
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RateLimitDecision {
    /// Whether the request is allowed
    pub allowed: bool,
    /// Requests remaining in the window
    pub remaining: i64,
    /// Epoch ms when the oldest entry leaves the window
    pub reset_at: i64,
}

/// Sliding-window rate limiter over the cache backend
pub struct RateLimiter {
    cache: Arc<CacheService>,
}

impl RateLimiter {
    pub fn new(cache: Arc<CacheService>) -> Self {
        Self { cache }
    }

    /// Check the organisation's window against `limit`.
    ///
    /// Returns `None` when the backing store fails (fail open).
    pub async fn check(&self, org_id: &str, limit: i64) -> Option<RateLimitDecision> {
        let key = CacheKey::rate_limit_span(org_id);
        let now = now_ms();
        let cutoff = now - (RATE_LIMIT_WINDOW_SECS as i64) * 1000;

        let survey = match self.cache.window_survey(&key, cutoff).await {
            Ok(s) => s,
            Err(e) => {
                tracing::warn!(
                    org_id,
                    error = %e,
                    "Rate limit store unreachable, failing open"
                );
                return None;
            }
        };

        let count = survey.count as i64;
        let allowed = count < limit;
        let remaining = (limit - count).max(0);
        let reset_at = survey
            .oldest_ms
            .map(|oldest| oldest + (RATE_LIMIT_WINDOW_SECS as i64) * 1000)
            .unwrap_or(now + (RATE_LIMIT_WINDOW_SECS as i64) * 1000);

        tracing::trace!(org_id, count, limit, allowed, "Rate limit check");

        Some(RateLimitDecision {
            allowed,
            remaining,
            reset_at,
        })
    }

    /// Record `n` ingested spans against the organisation's window.
    ///
    /// Members carry a random suffix so concurrent inserts at the same
    /// millisecond do not collide. Errors are logged, not propagated.
    pub async fn record(&self, org_id: &str, n: usize) {
        if n == 0 {
            return;
        }

        let key = CacheKey::rate_limit_span(org_id);
        let now = now_ms();
        let mut suffix = [0u8; 4];
        rand::thread_rng().fill_bytes(&mut suffix);
        let suffix = hex::encode(suffix);

        let members: Vec<(i64, String)> = (0..n)
            .map(|i| (now, format!("{}-{}-{}", now, suffix, i)))
            .collect();

        if let Err(e) = self
            .cache
            .window_record(
                &key,
                &members,
                Duration::from_secs(RATE_LIMIT_KEY_EXPIRY_SECS),
            )
            .await
        {
            tracing::warn!(org_id, error = %e, "Failed to record rate limit usage");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(Arc::new(CacheService::memory_for_test()))
    }

    #[tokio::test]
    async fn test_allows_under_limit() {
        let limiter = limiter();
        for i in 0..5 {
            let decision = limiter.check("org1", 10).await.unwrap();
            assert!(decision.allowed, "Request {} should be allowed", i);
            limiter.record("org1", 1).await;
        }
        let decision = limiter.check("org1", 10).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 5);
    }

    #[tokio::test]
    async fn test_blocks_at_limit() {
        let limiter = limiter();
        limiter.record("org1", 5).await;

        let decision = limiter.check("org1", 5).await.unwrap();
        assert!(!decision.allowed);
        assert_eq!(decision.remaining, 0);
        assert!(decision.reset_at > now_ms());
    }

    #[tokio::test]
    async fn test_last_slot_then_exhausted() {
        let limiter = limiter();
        limiter.record("org1", 4).await;

        // One slot left
        let decision = limiter.check("org1", 5).await.unwrap();
        assert!(decision.allowed);
        assert_eq!(decision.remaining, 1);
        limiter.record("org1", 1).await;

        // Window full
        let decision = limiter.check("org1", 5).await.unwrap();
        assert!(!decision.allowed);
    }

    #[tokio::test]
    async fn test_different_orgs_independent() {
        let limiter = limiter();
        limiter.record("org1", 5).await;

        assert!(!limiter.check("org1", 5).await.unwrap().allowed);
        assert!(limiter.check("org2", 5).await.unwrap().allowed);
    }

    #[tokio::test]
    async fn test_bulk_record_counts_each_span() {
        let limiter = limiter();
        limiter.record("org1", 100).await;

        let decision = limiter.check("org1", 1000).await.unwrap();
        assert_eq!(decision.remaining, 900);
    }

    #[tokio::test]
    async fn test_reset_at_without_entries() {
        let limiter = limiter();
        let before = now_ms();
        let decision = limiter.check("org1", 5).await.unwrap();
        // Empty window resets one full window from now
        assert!(decision.reset_at >= before + (RATE_LIMIT_WINDOW_SECS as i64) * 1000);
    }
}

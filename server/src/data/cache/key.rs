//! Type-safe cache key builder with versioning

use crate::core::constants::CACHE_KEY_VERSION;

/// Type-safe cache key builder
///
/// All keys are prefixed with a version (e.g., "v1:") to allow invalidating
/// all cached data on schema changes.
pub struct CacheKey;

impl CacheKey {
    /// Sliding-window key for span-ingestion quotas
    pub fn rate_limit_span(org_id: &str) -> String {
        format!("{}:rate_limit:span:{}", CACHE_KEY_VERSION, org_id)
    }

    /// Cache key for API key lookup by hash
    pub fn api_key_by_hash(key_hash: &str) -> String {
        format!("{}:api_key:hash:{}", CACHE_KEY_VERSION, key_hash)
    }

    /// Cache key for negative API key lookup (hash known not to exist)
    pub fn api_key_negative(key_hash: &str) -> String {
        format!("{}:api_key:neg:{}", CACHE_KEY_VERSION, key_hash)
    }

    /// Cache key for organisation by ID
    pub fn organization(id: &str) -> String {
        format!("{}:org:{}", CACHE_KEY_VERSION, id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_keys_are_versioned_and_distinct() {
        let window = CacheKey::rate_limit_span("org1");
        assert!(window.starts_with("v1:"));
        assert!(window.contains("rate_limit:span:org1"));

        assert_ne!(
            CacheKey::api_key_by_hash("abc"),
            CacheKey::api_key_negative("abc")
        );
    }
}

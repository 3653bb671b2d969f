//! API key repository
//!
//! Lookups go by key hash only; the plaintext never reaches the server.
//! Read operations support optional caching (positive + negative) so hot
//! ingestion paths avoid a database round-trip per request.

use std::time::Duration;

use sqlx::{PgPool, Row};

use crate::core::constants::{CACHE_TTL_API_KEY_INVALID, CACHE_TTL_API_KEY_VALID};
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::{ApiKeyRole, ApiKeyValidation};

/// Get API key validation info by hash (with optional caching)
pub async fn get_by_hash(
    pool: &PgPool,
    cache: Option<&CacheService>,
    key_hash: &str,
) -> Result<Option<ApiKeyValidation>, PostgresError> {
    if let Some(cache) = cache {
        let key = CacheKey::api_key_by_hash(key_hash);
        let neg_key = CacheKey::api_key_negative(key_hash);

        // Try positive cache first
        match cache.get::<ApiKeyValidation>(&key).await {
            Ok(Some(validation)) => {
                tracing::trace!("API key cache hit");
                return Ok(Some(validation));
            }
            Err(e) => tracing::warn!(error = %e, "Cache get error"),
            Ok(None) => {}
        }

        // Check negative cache (known not-found)
        if cache.exists(&neg_key).await.unwrap_or(false) {
            tracing::trace!("API key negative cache hit");
            return Ok(None);
        }

        let result = get_by_hash_from_db(pool, key_hash).await?;

        match &result {
            Some(v) => {
                if let Err(e) = cache
                    .set(&key, v, Some(Duration::from_secs(CACHE_TTL_API_KEY_VALID)))
                    .await
                {
                    tracing::warn!(error = %e, "Cache set error");
                }
            }
            None => {
                if let Err(e) = cache
                    .set_raw(
                        &neg_key,
                        vec![],
                        Some(Duration::from_secs(CACHE_TTL_API_KEY_INVALID)),
                    )
                    .await
                {
                    tracing::warn!(error = %e, "Cache set (negative) error");
                }
            }
        }

        Ok(result)
    } else {
        get_by_hash_from_db(pool, key_hash).await
    }
}

async fn get_by_hash_from_db(
    pool: &PgPool,
    key_hash: &str,
) -> Result<Option<ApiKeyValidation>, PostgresError> {
    let row = sqlx::query("SELECT id, organisation, role FROM api_keys WHERE key_hash = $1")
        .bind(key_hash)
        .fetch_optional(pool)
        .await?;

    row.map(|row| {
        let role: String = row.try_get("role")?;
        let role = ApiKeyRole::parse(&role)
            .ok_or_else(|| PostgresError::Decode(format!("Unknown API key role: {role}")))?;
        Ok(ApiKeyValidation {
            key_id: row.try_get("id")?,
            organisation: row.try_get("organisation")?,
            role,
        })
    })
    .transpose()
}

/// Create an API key record. Accepts only the hash and last-4 suffix.
pub async fn create(
    pool: &PgPool,
    org_id: &str,
    key_hash: &str,
    key_suffix: &str,
    role: ApiKeyRole,
    name: Option<&str>,
) -> Result<String, PostgresError> {
    let id = uuid::Uuid::new_v4().to_string();
    let now = crate::utils::time::now_ms();

    sqlx::query(
        r#"INSERT INTO api_keys (id, organisation, key_hash, key_suffix, role, name, created, updated)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $7)"#,
    )
    .bind(&id)
    .bind(org_id)
    .bind(key_hash)
    .bind(key_suffix)
    .bind(role.as_str())
    .bind(name)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(id)
}

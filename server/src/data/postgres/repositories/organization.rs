//! Organisation repository

use std::time::Duration;

use sqlx::{PgPool, Row};

use crate::core::constants::CACHE_TTL_ORG;
use crate::data::cache::{CacheKey, CacheService};
use crate::data::postgres::PostgresError;
use crate::data::types::{Organization, SubscriptionTier};

/// Get an organisation by id (with optional caching)
pub async fn get(
    pool: &PgPool,
    cache: Option<&CacheService>,
    id: &str,
) -> Result<Option<Organization>, PostgresError> {
    if let Some(cache) = cache {
        let key = CacheKey::organization(id);
        match cache.get::<Organization>(&key).await {
            Ok(Some(org)) => return Ok(Some(org)),
            Err(e) => tracing::warn!(error = %e, "Cache get error"),
            Ok(None) => {}
        }

        let result = get_from_db(pool, id).await?;
        if let Some(org) = &result
            && let Err(e) = cache
                .set(&key, org, Some(Duration::from_secs(CACHE_TTL_ORG)))
                .await
        {
            tracing::warn!(error = %e, "Cache set error");
        }
        return Ok(result);
    }

    get_from_db(pool, id).await
}

async fn get_from_db(pool: &PgPool, id: &str) -> Result<Option<Organization>, PostgresError> {
    let row = sqlx::query(
        r#"SELECT id, name, subscription, members, rate_limit_per_hour, retention_days,
                  max_members, max_datasets, experiment_retention_days,
                  max_examples_per_dataset, created, updated
           FROM organizations WHERE id = $1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await?;

    row.map(|row| {
        Ok(Organization {
            id: row.try_get("id")?,
            name: row.try_get("name")?,
            subscription: SubscriptionTier::parse(row.try_get::<String, _>("subscription")?.as_str()),
            members: row.try_get("members")?,
            rate_limit_per_hour: row.try_get("rate_limit_per_hour")?,
            retention_days: row.try_get("retention_days")?,
            max_members: row.try_get("max_members")?,
            max_datasets: row.try_get("max_datasets")?,
            experiment_retention_days: row.try_get("experiment_retention_days")?,
            max_examples_per_dataset: row.try_get("max_examples_per_dataset")?,
            created: row.try_get("created")?,
            updated: row.try_get("updated")?,
        })
    })
    .transpose()
}

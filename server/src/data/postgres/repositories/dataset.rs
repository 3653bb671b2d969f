//! Dataset repository

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use crate::data::postgres::PostgresError;
use crate::data::types::{Dataset, Metric};
use crate::utils::time::now_ms;

fn row_to_dataset(row: &sqlx::postgres::PgRow) -> Result<Dataset, PostgresError> {
    let metrics: JsonValue = row.try_get("metrics")?;
    let metrics: Vec<Metric> = serde_json::from_value(metrics)
        .map_err(|e| PostgresError::Decode(format!("dataset metrics: {e}")))?;

    Ok(Dataset {
        id: row.try_get("id")?,
        organisation: row.try_get("organisation")?,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        tags: row.try_get("tags")?,
        input_schema: row.try_get("input_schema")?,
        output_schema: row.try_get("output_schema")?,
        metrics,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
    })
}

const SELECT: &str = r#"SELECT id, organisation, name, description, tags, input_schema,
    output_schema, metrics, created, updated FROM datasets"#;

pub async fn get(pool: &PgPool, id: &str) -> Result<Option<Dataset>, PostgresError> {
    let row = sqlx::query(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_dataset).transpose()
}

/// List datasets for an organisation, newest first
pub async fn list(
    pool: &PgPool,
    org_id: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Dataset>, PostgresError> {
    let rows = sqlx::query(&format!(
        "{SELECT} WHERE organisation = $1 ORDER BY created DESC LIMIT $2 OFFSET $3"
    ))
    .bind(org_id)
    .bind(limit)
    .bind(offset)
    .fetch_all(pool)
    .await?;
    rows.iter().map(row_to_dataset).collect()
}

pub async fn create(pool: &PgPool, dataset: &Dataset) -> Result<(), PostgresError> {
    let metrics = serde_json::to_value(&dataset.metrics)
        .map_err(|e| PostgresError::Decode(e.to_string()))?;

    sqlx::query(
        r#"INSERT INTO datasets (id, organisation, name, description, tags, input_schema,
               output_schema, metrics, created, updated)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)"#,
    )
    .bind(&dataset.id)
    .bind(&dataset.organisation)
    .bind(&dataset.name)
    .bind(&dataset.description)
    .bind(&dataset.tags)
    .bind(&dataset.input_schema)
    .bind(&dataset.output_schema)
    .bind(metrics)
    .bind(dataset.created)
    .bind(dataset.updated)
    .execute(pool)
    .await?;
    Ok(())
}

pub async fn update(pool: &PgPool, dataset: &Dataset) -> Result<bool, PostgresError> {
    let metrics = serde_json::to_value(&dataset.metrics)
        .map_err(|e| PostgresError::Decode(e.to_string()))?;

    let result = sqlx::query(
        r#"UPDATE datasets SET name = $2, description = $3, tags = $4, input_schema = $5,
               output_schema = $6, metrics = $7, updated = $8
           WHERE id = $1 AND organisation = $9"#,
    )
    .bind(&dataset.id)
    .bind(&dataset.name)
    .bind(&dataset.description)
    .bind(&dataset.tags)
    .bind(&dataset.input_schema)
    .bind(&dataset.output_schema)
    .bind(metrics)
    .bind(now_ms())
    .bind(&dataset.organisation)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: &str, org_id: &str) -> Result<bool, PostgresError> {
    let result = sqlx::query("DELETE FROM datasets WHERE id = $1 AND organisation = $2")
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

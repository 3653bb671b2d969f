//! Experiment repository
//!
//! Experiments are read-modify-written: `scoreAndStore` loads the row,
//! merges the new result, recomputes summaries, and writes back. List
//! queries accept a pre-compiled WHERE fragment from the query compiler.

use serde_json::Value as JsonValue;
use sqlx::{PgPool, Row};

use crate::data::postgres::PostgresError;
use crate::data::types::{Experiment, ExperimentStatus};
use crate::utils::time::now_ms;

fn row_to_experiment(row: &sqlx::postgres::PgRow) -> Result<Experiment, PostgresError> {
    let parameters: JsonValue = row.try_get("parameters")?;
    let summaries: JsonValue = row.try_get("summaries")?;
    let results: JsonValue = row.try_get("results")?;

    Ok(Experiment {
        id: row.try_get("id")?,
        dataset: row.try_get("dataset")?,
        organisation: row.try_get("organisation")?,
        batch: row.try_get("batch")?,
        name: row.try_get("name")?,
        parameters: serde_json::from_value(parameters)
            .map_err(|e| PostgresError::Decode(format!("experiment parameters: {e}")))?,
        status: ExperimentStatus::parse(row.try_get::<String, _>("status")?.as_str()),
        summaries: serde_json::from_value(summaries)
            .map_err(|e| PostgresError::Decode(format!("experiment summaries: {e}")))?,
        results: serde_json::from_value(results)
            .map_err(|e| PostgresError::Decode(format!("experiment results: {e}")))?,
        traces: row.try_get("traces")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
    })
}

const SELECT: &str = r#"SELECT id, dataset, organisation, batch, name, parameters, status,
    summaries, results, traces, created, updated FROM experiments"#;

pub async fn get(pool: &PgPool, id: &str) -> Result<Option<Experiment>, PostgresError> {
    let row = sqlx::query(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_experiment).transpose()
}

/// List experiments for an organisation with an extra compiled WHERE
/// fragment (the fragment is produced by the query compiler, which
/// validates identifiers and escapes values)
pub async fn list(
    pool: &PgPool,
    org_id: &str,
    where_fragment: &str,
    limit: i64,
    offset: i64,
) -> Result<Vec<Experiment>, PostgresError> {
    let sql = format!(
        "{SELECT} WHERE organisation = $1 AND ({where_fragment}) \
         ORDER BY created DESC LIMIT $2 OFFSET $3"
    );
    let rows = sqlx::query(&sql)
        .bind(org_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(pool)
        .await?;
    rows.iter().map(row_to_experiment).collect()
}

pub async fn create(pool: &PgPool, experiment: &Experiment) -> Result<(), PostgresError> {
    sqlx::query(
        r#"INSERT INTO experiments (id, dataset, organisation, batch, name, parameters,
               status, summaries, results, traces, created, updated)
           VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)"#,
    )
    .bind(&experiment.id)
    .bind(&experiment.dataset)
    .bind(&experiment.organisation)
    .bind(&experiment.batch)
    .bind(&experiment.name)
    .bind(encode(&experiment.parameters)?)
    .bind(experiment.status.as_str())
    .bind(encode(&experiment.summaries)?)
    .bind(encode(&experiment.results)?)
    .bind(&experiment.traces)
    .bind(experiment.created)
    .bind(experiment.updated)
    .execute(pool)
    .await?;
    Ok(())
}

/// Write back the mutable parts of an experiment
pub async fn update(pool: &PgPool, experiment: &Experiment) -> Result<bool, PostgresError> {
    let result = sqlx::query(
        r#"UPDATE experiments SET name = $2, batch = $3, parameters = $4, status = $5,
               summaries = $6, results = $7, traces = $8, updated = $9
           WHERE id = $1 AND organisation = $10"#,
    )
    .bind(&experiment.id)
    .bind(&experiment.name)
    .bind(&experiment.batch)
    .bind(encode(&experiment.parameters)?)
    .bind(experiment.status.as_str())
    .bind(encode(&experiment.summaries)?)
    .bind(encode(&experiment.results)?)
    .bind(&experiment.traces)
    .bind(now_ms())
    .bind(&experiment.organisation)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete(pool: &PgPool, id: &str, org_id: &str) -> Result<bool, PostgresError> {
    let result = sqlx::query("DELETE FROM experiments WHERE id = $1 AND organisation = $2")
        .bind(id)
        .bind(org_id)
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

fn encode<T: serde::Serialize>(value: &T) -> Result<JsonValue, PostgresError> {
    serde_json::to_value(value).map_err(|e| PostgresError::Decode(e.to_string()))
}

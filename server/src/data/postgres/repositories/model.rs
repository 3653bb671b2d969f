//! Provider model repository (read side for the LLM judge)

use sqlx::{PgPool, Row};

use crate::data::postgres::PostgresError;
use crate::data::types::{Model, ModelProvider};

fn row_to_model(row: &sqlx::postgres::PgRow) -> Result<Model, PostgresError> {
    let provider: String = row.try_get("provider")?;
    let provider = ModelProvider::parse(&provider)
        .ok_or_else(|| PostgresError::Decode(format!("Unknown model provider: {provider}")))?;

    Ok(Model {
        id: row.try_get("id")?,
        organisation: row.try_get("organisation")?,
        name: row.try_get("name")?,
        provider,
        model: row.try_get("model")?,
        api_key: row.try_get("api_key")?,
        base_url: row.try_get("base_url")?,
        created: row.try_get("created")?,
        updated: row.try_get("updated")?,
    })
}

const SELECT: &str = r#"SELECT id, organisation, name, provider, model, api_key, base_url,
    created, updated FROM models"#;

pub async fn get(pool: &PgPool, id: &str) -> Result<Option<Model>, PostgresError> {
    let row = sqlx::query(&format!("{SELECT} WHERE id = $1"))
        .bind(id)
        .fetch_optional(pool)
        .await?;
    row.as_ref().map(row_to_model).transpose()
}

/// Resolve a model by id or name within an organisation
pub async fn get_for_org(
    pool: &PgPool,
    org_id: &str,
    id_or_name: &str,
) -> Result<Option<Model>, PostgresError> {
    let row = sqlx::query(&format!(
        "{SELECT} WHERE organisation = $1 AND (id = $2 OR name = $2)"
    ))
    .bind(org_id)
    .bind(id_or_name)
    .fetch_optional(pool)
    .await?;
    row.as_ref().map(row_to_model).transpose()
}

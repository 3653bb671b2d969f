//! Dataset endpoints (thin CRUD over the repository)

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::Value as JsonValue;

use crate::api::auth::AuthContext;
use crate::api::server::AppState;
use crate::api::types::{ApiError, clamp_limit};
use crate::core::constants::DEFAULT_LIST_LIMIT;
use crate::data::postgres::repositories;
use crate::data::types::{ApiKeyRole, Dataset, Metric};
use crate::utils::time::now_ms;

pub async fn get(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Dataset>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let dataset = load_owned(&state, &ctx, &id).await?;
    Ok(Json(dataset))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Dataset>>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, 1000);
    let datasets = repositories::dataset::list(
        state.database.pool(),
        ctx.org_id(),
        limit as i64,
        params.offset.unwrap_or(0) as i64,
    )
    .await?;
    Ok(Json(datasets))
}

#[derive(Debug, Deserialize)]
pub struct CreateDataset {
    pub name: String,
    pub description: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Option<JsonValue>,
    #[serde(rename = "outputSchema")]
    pub output_schema: Option<JsonValue>,
    #[serde(default)]
    pub metrics: Vec<Metric>,
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateDataset>,
) -> Result<(StatusCode, Json<Dataset>), ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    let now = now_ms();
    let dataset = Dataset {
        id: uuid::Uuid::new_v4().to_string(),
        organisation: ctx.org_id().to_string(),
        name: body.name,
        description: body.description,
        tags: body.tags,
        input_schema: body.input_schema,
        output_schema: body.output_schema,
        metrics: body.metrics,
        created: now,
        updated: now,
    };

    repositories::dataset::create(state.database.pool(), &dataset).await?;
    Ok((StatusCode::CREATED, Json(dataset)))
}

#[derive(Debug, Deserialize)]
pub struct UpdateDataset {
    pub name: Option<String>,
    pub description: Option<String>,
    pub tags: Option<Vec<String>>,
    #[serde(rename = "inputSchema")]
    pub input_schema: Option<JsonValue>,
    #[serde(rename = "outputSchema")]
    pub output_schema: Option<JsonValue>,
    pub metrics: Option<Vec<Metric>>,
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<UpdateDataset>,
) -> Result<Json<Dataset>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let mut dataset = load_owned(&state, &ctx, &id).await?;

    if let Some(name) = body.name {
        dataset.name = name;
    }
    if body.description.is_some() {
        dataset.description = body.description;
    }
    if let Some(tags) = body.tags {
        dataset.tags = tags;
    }
    if body.input_schema.is_some() {
        dataset.input_schema = body.input_schema;
    }
    if body.output_schema.is_some() {
        dataset.output_schema = body.output_schema;
    }
    if let Some(metrics) = body.metrics {
        dataset.metrics = metrics;
    }

    repositories::dataset::update(state.database.pool(), &dataset).await?;
    Ok(Json(dataset))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require_role(ApiKeyRole::Admin)?;
    let deleted = repositories::dataset::delete(state.database.pool(), &id, ctx.org_id()).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Dataset not found: {id}")))
    }
}

async fn load_owned(state: &AppState, ctx: &AuthContext, id: &str) -> Result<Dataset, ApiError> {
    let dataset = repositories::dataset::get(state.database.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Dataset not found: {id}")))?;

    if dataset.organisation != ctx.org_id() {
        return Err(ApiError::permission_denied(
            "Dataset belongs to another organisation",
        ));
    }
    Ok(dataset)
}

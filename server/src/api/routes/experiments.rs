//! Experiment endpoints: CRUD, list-with-query, and scoreAndStore

use std::collections::BTreeMap;

use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Map, Value as JsonValue, json};

use crate::api::auth::AuthContext;
use crate::api::server::AppState;
use crate::api::types::{ApiError, clamp_limit};
use crate::core::constants::DEFAULT_LIST_LIMIT;
use crate::data::postgres::repositories;
use crate::data::types::{ApiKeyRole, Experiment, ExperimentStatus};
use crate::domain::experiments::score_and_store;
use crate::domain::query;
use crate::utils::time::now_ms;

#[derive(Debug, Deserialize)]
pub struct CreateExperiment {
    pub dataset: String,
    /// Must match the caller's organisation when present
    pub organisation: Option<String>,
    pub name: Option<String>,
    pub batch: Option<String>,
    #[serde(default)]
    pub parameters: Map<String, JsonValue>,
}

pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateExperiment>,
) -> Result<(StatusCode, Json<Experiment>), ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    if let Some(org) = &body.organisation
        && org != ctx.org_id()
    {
        return Err(ApiError::permission_denied(
            "organisation does not match the credential",
        ));
    }

    let now = now_ms();
    let experiment = Experiment {
        id: uuid::Uuid::new_v4().to_string(),
        dataset: body.dataset,
        organisation: ctx.org_id().to_string(),
        batch: body.batch,
        name: body
            .name
            .unwrap_or_else(|| format!("experiment-{}", now)),
        parameters: body.parameters,
        status: ExperimentStatus::Open,
        created: now,
        updated: now,
        ..Default::default()
    };

    repositories::experiment::create(state.database.pool(), &experiment).await?;
    Ok((StatusCode::CREATED, Json(experiment)))
}

pub async fn get(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<Json<Experiment>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let experiment = load_owned(&state, &ctx, &id).await?;
    Ok(Json(experiment))
}

#[derive(Debug, Deserialize)]
pub struct UpdateExperiment {
    pub name: Option<String>,
    pub batch: Option<String>,
    pub parameters: Option<Map<String, JsonValue>>,
    pub status: Option<ExperimentStatus>,
}

pub async fn update(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
    Json(body): Json<UpdateExperiment>,
) -> Result<Json<Experiment>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let mut experiment = load_owned(&state, &ctx, &id).await?;

    if let Some(name) = body.name {
        experiment.name = name;
    }
    if let Some(batch) = body.batch {
        experiment.batch = Some(batch);
    }
    if let Some(parameters) = body.parameters {
        experiment.parameters = parameters;
    }
    if let Some(status) = body.status {
        experiment.status = status;
    }

    repositories::experiment::update(state.database.pool(), &experiment).await?;
    Ok(Json(experiment))
}

pub async fn delete(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path(id): Path<String>,
) -> Result<StatusCode, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;
    let deleted =
        repositories::experiment::delete(state.database.pool(), &id, ctx.org_id()).await?;
    if deleted {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found(format!("Experiment not found: {id}")))
    }
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub organisation: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

/// List experiments; `q` compiles through the query language to SQL
pub async fn list(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Experiment>>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    if let Some(org) = &params.organisation
        && org != ctx.org_id()
    {
        return Err(ApiError::permission_denied(
            "organisation does not match the credential",
        ));
    }

    let node = query::parse(params.q.as_deref().unwrap_or(""));
    let where_fragment = query::sql::compile(&node)?;
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, 1000);
    let offset = params.offset.unwrap_or(0);

    let experiments = repositories::experiment::list(
        state.database.pool(),
        ctx.org_id(),
        &where_fragment,
        limit as i64,
        offset as i64,
    )
    .await?;

    Ok(Json(experiments))
}

#[derive(Debug, Deserialize)]
pub struct ScoreAndStoreBody {
    pub output: JsonValue,
    #[serde(rename = "traceId")]
    pub trace_id: Option<String>,
    #[serde(default)]
    pub scores: BTreeMap<String, f64>,
}

/// Score an engine output for one example and fold it into the experiment
pub async fn score_and_store_handler(
    State(state): State<AppState>,
    ctx: AuthContext,
    Path((id, example_id)): Path<(String, String)>,
    Json(body): Json<ScoreAndStoreBody>,
) -> Result<Json<JsonValue>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    let outcome = score_and_store(
        &state.database,
        &state.search,
        &state.scorer,
        ctx.org_id(),
        &id,
        &example_id,
        &body.output,
        body.trace_id,
        &body.scores,
    )
    .await?;

    let mut response = json!({
        "success": true,
        "scores": outcome.scores,
        "exampleId": outcome.example_id,
    });
    if !outcome.errors.is_empty() {
        response["errors"] = json!(outcome.errors);
    }
    Ok(Json(response))
}

async fn load_owned(
    state: &AppState,
    ctx: &AuthContext,
    id: &str,
) -> Result<Experiment, ApiError> {
    let experiment = repositories::experiment::get(state.database.pool(), id)
        .await?
        .ok_or_else(|| ApiError::not_found(format!("Experiment not found: {id}")))?;

    if experiment.organisation != ctx.org_id() {
        return Err(ApiError::permission_denied(
            "Experiment belongs to another organisation",
        ));
    }
    Ok(experiment)
}

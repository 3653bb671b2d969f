//! Example endpoints

use axum::Json;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use serde::Deserialize;
use serde_json::{Value as JsonValue, json};

use crate::api::auth::AuthContext;
use crate::api::server::AppState;
use crate::api::types::{ApiError, clamp_limit};
use crate::core::constants::{DEFAULT_LIST_LIMIT, EXAMPLE_ATTR};
use crate::data::types::{ApiKeyRole, Example, ExampleOutputs, ExampleSpan, Metric};
use crate::domain::query;
use crate::utils::time::now_ms;

#[derive(Debug, Deserialize)]
pub struct CreateExample {
    pub id: Option<String>,
    pub dataset: String,
    pub organisation: Option<String>,
    pub trace: Option<String>,
    pub name: Option<String>,
    pub tags: Option<Vec<String>>,
    pub annotations: Option<JsonValue>,
    pub spans: Option<Vec<ExampleSpan>>,
    pub input: Option<JsonValue>,
    pub outputs: Option<ExampleOutputs>,
    pub metrics: Option<Vec<Metric>>,
}

/// Create an example. The server generates a UUID when the id is absent or
/// empty; non-UUID ids are rejected; at most one example exists per
/// (trace, dataset).
pub async fn create(
    State(state): State<AppState>,
    ctx: AuthContext,
    Json(body): Json<CreateExample>,
) -> Result<(StatusCode, Json<Example>), ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    if let Some(org) = &body.organisation
        && org != ctx.org_id()
    {
        return Err(ApiError::permission_denied(
            "organisation does not match the credential",
        ));
    }

    let id = match body.id.filter(|id| !id.is_empty()) {
        Some(id) => {
            // Canonical 8-4-4-4-12 form only
            if id.len() != 36 || uuid::Uuid::parse_str(&id).is_err() {
                return Err(ApiError::invalid_argument(format!("id is not a UUID: {id}")));
            }
            id
        }
        None => uuid::Uuid::new_v4().to_string(),
    };

    if let Some(spans) = &body.spans
        && spans.iter().any(|s| s.id.is_empty())
    {
        return Err(ApiError::invalid_argument("every span must carry an id"));
    }

    // Uniqueness by (trace, dataset)
    if let Some(trace) = &body.trace
        && state
            .search
            .example_exists_for_trace(trace, &body.dataset)
            .await?
    {
        return Err(ApiError::conflict(format!(
            "Example already exists for trace \"{}\" and dataset \"{}\"",
            trace, body.dataset
        )));
    }

    let now = now_ms();
    let example = Example {
        id,
        dataset: body.dataset,
        organisation: ctx.org_id().to_string(),
        trace: body.trace,
        name: body.name,
        tags: body.tags,
        annotations: body.annotations,
        spans: body.spans,
        input: body.input,
        outputs: body.outputs,
        metrics: body.metrics,
        created: now,
        updated: now,
    };

    state.search.bulk_insert_examples(std::slice::from_ref(&example)).await?;

    // Best-effort back-write: stamp the source spans with the example id.
    // Failure is logged; example creation still succeeds.
    if let Some(spans) = &example.spans {
        for span in spans {
            let patch = json!({"attributes": {EXAMPLE_ATTR: example.id}, "example": example.id});
            if let Err(e) = state
                .search
                .update_span(&span.id, &patch, ctx.org_id())
                .await
            {
                tracing::warn!(span = %span.id, error = %e, "Example back-write failed");
            }
        }
    }

    Ok((StatusCode::CREATED, Json(example)))
}

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub organisation: Option<String>,
    pub dataset: Option<String>,
    #[serde(default)]
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

pub async fn list(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<ListQuery>,
) -> Result<Json<Vec<Example>>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    if let Some(org) = &params.organisation
        && org != ctx.org_id()
    {
        return Err(ApiError::permission_denied(
            "organisation does not match the credential",
        ));
    }

    let node = query::parse(params.q.as_deref().unwrap_or(""));
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, 1000);
    let offset = params.offset.unwrap_or(0);

    let examples = state
        .search
        .search_examples(
            &node,
            ctx.org_id(),
            params.dataset.as_deref(),
            limit,
            offset,
        )
        .await?;

    Ok(Json(examples))
}

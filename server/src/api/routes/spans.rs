//! Span endpoints: OTLP HTTP ingestion and search

use axum::Json;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::HeaderMap;
use axum::response::Response;
use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
};
use serde::Deserialize;

use super::otlp::encoding::{OtlpContentType, decode_request, success_response};
use crate::api::auth::AuthContext;
use crate::api::server::AppState;
use crate::api::types::{ApiError, clamp_limit};
use crate::core::constants::DEFAULT_LIST_LIMIT;
use crate::data::types::{ApiKeyRole, Span};
use crate::domain::query;

/// OTLP export over HTTP: JSON or protobuf selected by content type.
/// Returns the empty export response (`{}` as JSON) on success.
pub async fn export(
    State(state): State<AppState>,
    ctx: AuthContext,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let content_type = OtlpContentType::from_headers(&headers);
    let request: ExportTraceServiceRequest = decode_request(&body, content_type)?;

    state
        .pipeline
        .ingest(&ctx.organisation, ctx.role, &request)
        .await?;

    let response = ExportTraceServiceResponse {
        partial_success: None,
    };
    Ok(success_response(&response, content_type))
}

#[derive(Debug, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: Option<String>,
    pub limit: Option<usize>,
    pub offset: Option<usize>,
    /// Comma-separated source fields to include
    pub fields: Option<String>,
    /// Comma-separated source fields to exclude
    pub exclude: Option<String>,
}

/// Search spans with the query language, scoped to the caller's tenant
pub async fn search(
    State(state): State<AppState>,
    ctx: AuthContext,
    Query(params): Query<SearchQuery>,
) -> Result<Json<Vec<Span>>, ApiError> {
    ctx.require_role(ApiKeyRole::Developer)?;

    let node = query::parse(params.q.as_deref().unwrap_or(""));
    let limit = clamp_limit(params.limit, DEFAULT_LIST_LIMIT, 1000);
    let offset = params.offset.unwrap_or(0);

    let includes = params.fields.as_deref().map(split_fields);
    let excludes = params.exclude.as_deref().map(split_fields);

    let spans = state
        .search
        .search_spans(
            &node,
            ctx.org_id(),
            limit,
            offset,
            includes.as_deref(),
            excludes.as_deref(),
        )
        .await?;

    Ok(Json(spans))
}

fn split_fields(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(String::from)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_fields() {
        assert_eq!(
            split_fields("attributes, name,,start"),
            vec!["attributes", "name", "start"]
        );
    }
}

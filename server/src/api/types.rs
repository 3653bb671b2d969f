//! Shared API types: the error taxonomy and its HTTP/gRPC mappings
//!
//! Errors carry a kind and a short message; the edge maps kinds to HTTP
//! statuses or gRPC codes. Responses are JSON `{error, details?}` and never
//! reveal backing-store internals.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::domain::experiments::StoreError;
use crate::domain::ingest::IngestError;
use crate::domain::query::SqlCompileError;
use crate::data::postgres::PostgresError;
use crate::data::search::SearchError;

#[derive(Debug)]
pub enum ApiError {
    Unauthenticated(String),
    PermissionDenied(String),
    InvalidArgument(String),
    ResourceExhausted { message: String, reset_at: i64 },
    NotFound(String),
    Conflict(String),
    Unavailable(String),
    Internal(String),
}

impl ApiError {
    pub fn unauthenticated(message: impl Into<String>) -> Self {
        Self::Unauthenticated(message.into())
    }

    pub fn permission_denied(message: impl Into<String>) -> Self {
        Self::PermissionDenied(message.into())
    }

    pub fn invalid_argument(message: impl Into<String>) -> Self {
        Self::InvalidArgument(message.into())
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::NotFound(message.into())
    }

    pub fn conflict(message: impl Into<String>) -> Self {
        Self::Conflict(message.into())
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// gRPC mapping of the same taxonomy
    pub fn to_status(&self) -> tonic::Status {
        match self {
            Self::Unauthenticated(m) => tonic::Status::unauthenticated(m.clone()),
            Self::PermissionDenied(m) => tonic::Status::permission_denied(m.clone()),
            Self::InvalidArgument(m) => tonic::Status::invalid_argument(m.clone()),
            Self::ResourceExhausted { message, .. } => {
                tonic::Status::resource_exhausted(message.clone())
            }
            Self::NotFound(m) => tonic::Status::not_found(m.clone()),
            Self::Conflict(m) => tonic::Status::already_exists(m.clone()),
            Self::Unavailable(_) => tonic::Status::unavailable("Backing store unavailable"),
            Self::Internal(_) => tonic::Status::internal("Internal error"),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error, details) = match self {
            Self::Unauthenticated(m) => (StatusCode::UNAUTHORIZED, "Unauthenticated", Some(m)),
            Self::PermissionDenied(m) => (StatusCode::FORBIDDEN, "Permission denied", Some(m)),
            Self::InvalidArgument(m) => (StatusCode::BAD_REQUEST, "Invalid request", Some(m)),
            Self::ResourceExhausted { message, reset_at } => {
                let retry_after = ((reset_at - crate::utils::time::now_ms()) / 1000).max(0);
                return (
                    StatusCode::TOO_MANY_REQUESTS,
                    [(axum::http::header::RETRY_AFTER, retry_after.to_string())],
                    Json(json!({"error": "Rate limit exceeded", "details": message})),
                )
                    .into_response();
            }
            Self::NotFound(m) => (StatusCode::NOT_FOUND, "Not found", Some(m)),
            Self::Conflict(m) => (StatusCode::CONFLICT, "Conflict", Some(m)),
            Self::Unavailable(m) => {
                tracing::warn!(error = %m, "Backing store unavailable");
                (StatusCode::SERVICE_UNAVAILABLE, "Service unavailable", None)
            }
            Self::Internal(m) => {
                // Correlation id instead of internals; the message stays in
                // the server log only
                let correlation = uuid::Uuid::new_v4().to_string();
                tracing::error!(correlation = %correlation, error = %m, "Internal error");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"error": "Internal error", "details": correlation})),
                )
                    .into_response();
            }
        };

        let body = match details {
            Some(details) => json!({"error": error, "details": details}),
            None => json!({"error": error}),
        };
        (status, Json(body)).into_response()
    }
}

impl From<IngestError> for ApiError {
    fn from(e: IngestError) -> Self {
        let message = e.to_string();
        match e {
            IngestError::Forbidden => Self::PermissionDenied(message),
            IngestError::RateLimited { reset_at } => Self::ResourceExhausted { message, reset_at },
            IngestError::Unavailable(m) => Self::Unavailable(m),
            IngestError::Internal(m) => Self::Internal(m),
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        let message = e.to_string();
        match e {
            StoreError::ExperimentNotFound(_) | StoreError::ExampleNotFound(_) => {
                Self::NotFound(message)
            }
            StoreError::Forbidden => Self::PermissionDenied(message),
            StoreError::Unavailable(m) => Self::Unavailable(m),
            StoreError::Internal(m) => Self::Internal(m),
        }
    }
}

impl From<PostgresError> for ApiError {
    fn from(e: PostgresError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<SearchError> for ApiError {
    fn from(e: SearchError) -> Self {
        if e.is_unavailable() {
            Self::Unavailable(e.to_string())
        } else {
            Self::Internal(e.to_string())
        }
    }
}

impl From<SqlCompileError> for ApiError {
    fn from(e: SqlCompileError) -> Self {
        Self::InvalidArgument(e.to_string())
    }
}

/// Clamp a client-supplied page size
pub fn clamp_limit(limit: Option<usize>, default: usize, max: usize) -> usize {
    limit.unwrap_or(default).clamp(1, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clamp_limit() {
        assert_eq!(clamp_limit(None, 100, 1000), 100);
        assert_eq!(clamp_limit(Some(0), 100, 1000), 1);
        assert_eq!(clamp_limit(Some(5000), 100, 1000), 1000);
        assert_eq!(clamp_limit(Some(50), 100, 1000), 50);
    }

    #[test]
    fn test_grpc_mapping() {
        let status = ApiError::ResourceExhausted {
            message: "quota".into(),
            reset_at: 0,
        }
        .to_status();
        assert_eq!(status.code(), tonic::Code::ResourceExhausted);

        assert_eq!(
            ApiError::unauthenticated("no key").to_status().code(),
            tonic::Code::Unauthenticated
        );
        assert_eq!(
            ApiError::conflict("dup").to_status().code(),
            tonic::Code::AlreadyExists
        );
    }
}

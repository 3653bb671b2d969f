//! Request authentication
//!
//! `Authorization: ApiKey <plaintext>` is hashed (SHA-256) and looked up —
//! the plaintext is never persisted or logged. `Authorization: Bearer
//! <jwt>` verifies against the configured HS256 secret. Both resolve to an
//! `AuthContext` carrying the organisation and the effective role.

pub mod jwt;

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::header;
use axum::http::request::Parts;

use crate::api::server::AppState;
use crate::api::types::ApiError;
use crate::core::config::AuthConfig;
use crate::data::cache::CacheService;
use crate::data::postgres::{PostgresService, repositories};
use crate::data::types::{ApiKeyRole, Organization};
use crate::utils::crypto::sha256_hex;

/// Authenticated request identity
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub organisation: Organization,
    pub role: ApiKeyRole,
    /// Present for API-key auth, absent for JWTs
    pub key_id: Option<String>,
}

impl AuthContext {
    pub fn org_id(&self) -> &str {
        &self.organisation.id
    }

    /// REST surface check; ingestion uses `ApiKeyRole::can_ingest`
    pub fn require_role(&self, required: ApiKeyRole) -> Result<(), ApiError> {
        if self.role.has_role(required) {
            Ok(())
        } else {
            Err(ApiError::permission_denied(
                "API key role does not permit this operation",
            ))
        }
    }
}

/// Resolve an Authorization header value to an authenticated context
pub async fn authenticate(
    database: &Arc<PostgresService>,
    cache: &Arc<CacheService>,
    auth_config: &AuthConfig,
    header_value: Option<&str>,
) -> Result<AuthContext, ApiError> {
    let header_value = header_value
        .ok_or_else(|| ApiError::unauthenticated("Authorization header required"))?
        .trim();

    if let Some(plaintext) = header_value.strip_prefix("ApiKey ") {
        return authenticate_api_key(database, cache, plaintext.trim()).await;
    }

    if let Some(token) = header_value.strip_prefix("Bearer ") {
        return authenticate_jwt(database, cache, auth_config, token.trim()).await;
    }

    Err(ApiError::unauthenticated(
        "Authorization must be 'ApiKey <key>' or 'Bearer <token>'",
    ))
}

async fn authenticate_api_key(
    database: &Arc<PostgresService>,
    cache: &Arc<CacheService>,
    plaintext: &str,
) -> Result<AuthContext, ApiError> {
    if plaintext.is_empty() {
        return Err(ApiError::unauthenticated("Empty API key"));
    }

    let key_hash = sha256_hex(plaintext);
    let validation = repositories::api_key::get_by_hash(database.pool(), Some(cache), &key_hash)
        .await?
        .ok_or_else(|| ApiError::unauthenticated("Invalid API key"))?;

    let organisation = load_org(database, cache, &validation.organisation).await?;

    Ok(AuthContext {
        organisation,
        role: validation.role,
        key_id: Some(validation.key_id),
    })
}

async fn authenticate_jwt(
    database: &Arc<PostgresService>,
    cache: &Arc<CacheService>,
    auth_config: &AuthConfig,
    token: &str,
) -> Result<AuthContext, ApiError> {
    let secret = auth_config
        .jwt_secret
        .as_deref()
        .ok_or_else(|| ApiError::unauthenticated("Bearer auth is not configured"))?;

    let claims = jwt::verify(secret, token)?;
    let organisation = load_org(database, cache, &claims.org).await?;

    Ok(AuthContext {
        organisation,
        role: claims.role,
        key_id: None,
    })
}

async fn load_org(
    database: &Arc<PostgresService>,
    cache: &Arc<CacheService>,
    org_id: &str,
) -> Result<Organization, ApiError> {
    repositories::organization::get(database.pool(), Some(cache), org_id)
        .await?
        .ok_or_else(|| {
            tracing::warn!(org_id, "Credential resolves to a missing organisation");
            ApiError::unauthenticated("Invalid credential")
        })
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let header_value = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        authenticate(&state.database, &state.cache, &state.auth, header_value).await
    }
}

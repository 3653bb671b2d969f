//! Bearer JWT verification (HS256)

use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};

use crate::api::types::ApiError;
use crate::data::types::ApiKeyRole;

/// Claims carried by service-issued tokens
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user or service id)
    pub sub: String,
    /// Organisation the token acts for
    pub org: String,
    /// Role granted to the token
    pub role: ApiKeyRole,
    /// Expiry, epoch seconds
    pub exp: i64,
}

/// Verify a bearer token against the configured HS256 secret
pub fn verify(secret: &str, token: &str) -> Result<Claims, ApiError> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let validation = Validation::new(Algorithm::HS256);

    decode::<Claims>(token, &key, &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!(error = %e, "JWT verification failed");
            ApiError::unauthenticated("Invalid or expired token")
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{EncodingKey, Header, encode};

    fn token(secret: &str, exp_offset: i64) -> String {
        let claims = Claims {
            sub: "user1".into(),
            org: "org1".into(),
            role: ApiKeyRole::Developer,
            exp: chrono::Utc::now().timestamp() + exp_offset,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    #[test]
    fn test_verify_valid_token() {
        let claims = verify("secret", &token("secret", 3600)).unwrap();
        assert_eq!(claims.org, "org1");
        assert_eq!(claims.role, ApiKeyRole::Developer);
    }

    #[test]
    fn test_verify_wrong_secret() {
        assert!(verify("other", &token("secret", 3600)).is_err());
    }

    #[test]
    fn test_verify_expired_token() {
        assert!(verify("secret", &token("secret", -3600)).is_err());
    }
}

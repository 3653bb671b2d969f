//! API key rows and roles

use serde::{Deserialize, Serialize};

/// API key role; ordering is trace < developer < admin
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ApiKeyRole {
    Trace,
    Developer,
    Admin,
}

impl ApiKeyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Trace => "trace",
            Self::Developer => "developer",
            Self::Admin => "admin",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "trace" => Some(Self::Trace),
            "developer" => Some(Self::Developer),
            "admin" => Some(Self::Admin),
            _ => None,
        }
    }

    fn level(&self) -> u8 {
        match self {
            Self::Trace => 0,
            Self::Developer => 1,
            Self::Admin => 2,
        }
    }

    /// Span ingestion is open to every role
    pub fn can_ingest(&self) -> bool {
        true
    }

    /// REST read/write surface requires developer or above
    pub fn has_role(&self, required: ApiKeyRole) -> bool {
        self.level() >= required.level()
    }
}

/// Validated key identity resolved from the hash lookup.
/// The plaintext never reaches the server; only its SHA-256 does.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiKeyValidation {
    pub key_id: String,
    pub organisation: String,
    pub role: ApiKeyRole,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_ordering() {
        assert!(ApiKeyRole::Admin.has_role(ApiKeyRole::Developer));
        assert!(ApiKeyRole::Developer.has_role(ApiKeyRole::Developer));
        assert!(!ApiKeyRole::Trace.has_role(ApiKeyRole::Developer));
    }

    #[test]
    fn test_all_roles_can_ingest() {
        assert!(ApiKeyRole::Trace.can_ingest());
        assert!(ApiKeyRole::Developer.can_ingest());
        assert!(ApiKeyRole::Admin.can_ingest());
    }

    #[test]
    fn test_role_parse() {
        assert_eq!(ApiKeyRole::parse("trace"), Some(ApiKeyRole::Trace));
        assert_eq!(ApiKeyRole::parse("root"), None);
    }
}

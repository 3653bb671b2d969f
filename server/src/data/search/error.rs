//! Search engine error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Search engine connection error: {0}")]
    Connection(String),

    #[error("Search engine request failed ({status}): {body}")]
    Request { status: u16, body: String },

    #[error("Version conflict on {0}")]
    Conflict(String),

    #[error("Response decoding error: {0}")]
    Decode(String),
}

impl SearchError {
    pub fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_connect() || e.is_timeout() {
            Self::Connection(e.to_string())
        } else {
            Self::Request {
                status: e.status().map(|s| s.as_u16()).unwrap_or(0),
                body: e.to_string(),
            }
        }
    }

    /// Whether the failure maps to UNAVAILABLE at the edge
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Connection(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_is_unavailable() {
        assert!(SearchError::Connection("refused".into()).is_unavailable());
        assert!(
            !SearchError::Request {
                status: 400,
                body: "bad".into()
            }
            .is_unavailable()
        );
    }
}

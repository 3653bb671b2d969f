//! PostgreSQL error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostgresError {
    #[error("PostgreSQL configuration error: {0}")]
    Config(String),

    #[error("PostgreSQL connection error: {0}")]
    Connection(String),

    #[error("Row decoding error: {0}")]
    Decode(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("PostgreSQL error: {0}")]
    Sqlx(#[from] sqlx::Error),
}

impl PostgresError {
    /// Whether the underlying failure is a connectivity problem
    /// (mapped to UNAVAILABLE at the edge)
    pub fn is_unavailable(&self) -> bool {
        match self {
            Self::Connection(_) => true,
            Self::Sqlx(e) => matches!(
                e,
                sqlx::Error::PoolTimedOut | sqlx::Error::PoolClosed | sqlx::Error::Io(_)
            ),
            _ => false,
        }
    }
}

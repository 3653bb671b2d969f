//! PostgreSQL database service
//!
//! Centralized database management: connection pooling with min/max bounds,
//! acquire timeouts, and schema bootstrap. The pool is a process-wide
//! singleton created once at startup and closed on shutdown.

pub mod error;
pub mod repositories;
mod schema;

pub use error::PostgresError;
pub use sqlx::PgPool;

use std::time::Duration;

use sqlx::postgres::PgPoolOptions;

use crate::core::config::StoreConfig;
use crate::core::constants::{
    POSTGRES_ACQUIRE_TIMEOUT_SECS, POSTGRES_MAX_CONNECTIONS, POSTGRES_MIN_CONNECTIONS,
};

/// PostgreSQL database service
pub struct PostgresService {
    pool: PgPool,
}

impl PostgresService {
    /// Initialize the database service: create the pool and bootstrap the
    /// schema.
    pub async fn init(config: &StoreConfig) -> Result<Self, PostgresError> {
        if config.database_url.is_empty() {
            return Err(PostgresError::Config("PostgreSQL URL is required".into()));
        }

        let pool = PgPoolOptions::new()
            .max_connections(POSTGRES_MAX_CONNECTIONS)
            .min_connections(POSTGRES_MIN_CONNECTIONS)
            .acquire_timeout(Duration::from_secs(POSTGRES_ACQUIRE_TIMEOUT_SECS))
            .connect(&config.database_url)
            .await
            .map_err(|e| PostgresError::Connection(e.to_string()))?;

        for ddl in schema::SCHEMA {
            sqlx::query(ddl).execute(&pool).await?;
        }

        tracing::debug!("PostgreSQL connected and schema ensured");

        Ok(Self { pool })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn close(&self) {
        self.pool.close().await;
        tracing::debug!("PostgreSQL pool closed");
    }
}

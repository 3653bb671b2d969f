//! Process-wide configuration
//!
//! Everything is read from the environment (or CLI flags) once at startup
//! into an immutable structure passed by value to the handlers.

use anyhow::{Result, bail};

use super::cli::Cli;
use super::constants::{DEFAULT_GRPC_PORT, DEFAULT_HOST, DEFAULT_PORT};

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub grpc_port: u16,
}

#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// postgres:// connection string
    pub database_url: String,
    /// Search engine base URL
    pub elasticsearch_url: String,
    /// Rate-limit store URL; None selects the in-memory backend
    pub redis_url: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AuthConfig {
    /// HS256 secret for Bearer JWTs; None disables JWT auth
    pub jwt_secret: Option<String>,
    /// Bootstrap admin email (used by the external CRUD surface; logged here)
    pub admin_email: Option<String>,
}

#[derive(Debug, Clone)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub stores: StoreConfig,
    pub auth: AuthConfig,
}

impl AppConfig {
    pub fn load(cli: &Cli) -> Result<Self> {
        let database_url = match &cli.database_url {
            Some(url) if !url.is_empty() => url.clone(),
            _ => bail!("DATABASE_URL is required"),
        };
        let elasticsearch_url = match &cli.elasticsearch_url {
            Some(url) if !url.is_empty() => url.trim_end_matches('/').to_string(),
            _ => bail!("ELASTICSEARCH_URL is required"),
        };

        Ok(Self {
            server: ServerConfig {
                host: cli.host.clone().unwrap_or_else(|| DEFAULT_HOST.to_string()),
                port: cli.port.unwrap_or(DEFAULT_PORT),
                grpc_port: cli.grpc_port.unwrap_or(DEFAULT_GRPC_PORT),
            },
            stores: StoreConfig {
                database_url,
                elasticsearch_url,
                redis_url: cli.redis_url.clone().filter(|s| !s.is_empty()),
            },
            auth: AuthConfig {
                jwt_secret: cli.jwt_secret.clone().filter(|s| !s.is_empty()),
                admin_email: cli.admin_email.clone().filter(|s| !s.is_empty()),
            },
        })
    }
}

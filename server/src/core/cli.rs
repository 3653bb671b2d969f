use clap::Parser;

use super::constants::{
    ENV_ADMIN_EMAIL, ENV_DATABASE_URL, ENV_ELASTICSEARCH_URL, ENV_GRPC_PORT, ENV_HOST,
    ENV_JWT_SECRET, ENV_PORT, ENV_REDIS_URL,
};

#[derive(Parser)]
#[command(name = "aiqa")]
#[command(version, about = "AIQA — evaluation and telemetry backend", long_about = None)]
pub struct Cli {
    /// Server host address
    #[arg(long, short = 'H', env = ENV_HOST)]
    pub host: Option<String>,

    /// HTTP port (REST + OTLP/HTTP)
    #[arg(long, short = 'p', env = ENV_PORT)]
    pub port: Option<u16>,

    /// OTLP gRPC port
    #[arg(long, env = ENV_GRPC_PORT)]
    pub grpc_port: Option<u16>,

    /// SQL store URL (postgres://…)
    #[arg(long, env = ENV_DATABASE_URL)]
    pub database_url: Option<String>,

    /// Search engine URL
    #[arg(long, env = ENV_ELASTICSEARCH_URL)]
    pub elasticsearch_url: Option<String>,

    /// Rate-limit store URL (redis://…); omitted = in-memory window store
    #[arg(long, env = ENV_REDIS_URL)]
    pub redis_url: Option<String>,

    /// Bootstrap admin email
    #[arg(long, env = ENV_ADMIN_EMAIL)]
    pub admin_email: Option<String>,

    /// HS256 secret for Bearer JWT verification
    #[arg(long, env = ENV_JWT_SECRET, hide_env_values = true)]
    pub jwt_secret: Option<String>,
}

/// Parse CLI arguments (environment variables supply defaults)
pub fn parse() -> Cli {
    Cli::parse()
}

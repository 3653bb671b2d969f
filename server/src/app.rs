//! Core application

use std::sync::Arc;

use anyhow::Result;

use crate::api::{ApiServer, OtlpGrpcServer};
use crate::core::cli;
use crate::core::config::AppConfig;
use crate::core::constants::{APP_NAME_LOWER, ENV_LOG};
use crate::core::shutdown::ShutdownService;
use crate::data::cache::{CacheService, RateLimiter};
use crate::data::postgres::PostgresService;
use crate::data::search::SearchService;
use crate::domain::ingest::IngestPipeline;
use crate::domain::scoring::Scorer;

pub struct CoreApp {
    pub shutdown: ShutdownService,
    pub config: AppConfig,
    pub database: Arc<PostgresService>,
    pub search: Arc<SearchService>,
    pub cache: Arc<CacheService>,
    pub rate_limiter: Arc<RateLimiter>,
    pub pipeline: Arc<IngestPipeline>,
    pub scorer: Arc<Scorer>,
}

impl CoreApp {
    /// Run the application with CLI argument parsing
    pub async fn run() -> Result<()> {
        dotenvy::dotenv().ok();
        Self::init_logging();

        tracing::debug!("Application starting");

        let cli = cli::parse();
        let app = Self::init(&cli).await?;
        Self::start_server(app).await
    }

    async fn init(cli: &cli::Cli) -> Result<Self> {
        let config = AppConfig::load(cli)?;

        if let Some(email) = &config.auth.admin_email {
            tracing::debug!(admin = %email, "Bootstrap admin configured");
        }

        let cache = Arc::new(
            CacheService::new(config.stores.redis_url.as_deref())
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize cache service: {}", e))?,
        );
        tracing::debug!(backend = cache.backend_name(), "Cache initialized");

        let rate_limiter = Arc::new(RateLimiter::new(cache.clone()));

        let database = Arc::new(
            PostgresService::init(&config.stores)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize SQL store: {}", e))?,
        );

        let search = Arc::new(
            SearchService::init(&config.stores)
                .await
                .map_err(|e| anyhow::anyhow!("Failed to initialize search store: {}", e))?,
        );
        search
            .ensure_indices()
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bootstrap search indices: {}", e))?;

        let pipeline = Arc::new(IngestPipeline::new(search.clone(), rate_limiter.clone()));

        let scorer = Arc::new(Scorer::new(database.clone()));

        let shutdown = ShutdownService::new(database.clone(), search.clone());

        Ok(Self {
            shutdown,
            config,
            database,
            search,
            cache,
            rate_limiter,
            pipeline,
            scorer,
        })
    }

    fn init_logging() {
        let default_filter = format!("info,{}=info", APP_NAME_LOWER);

        let filter = std::env::var(ENV_LOG)
            .or_else(|_| std::env::var("RUST_LOG"))
            .unwrap_or(default_filter);

        tracing_subscriber::fmt()
            .with_target(false)
            .with_thread_ids(false)
            .with_level(true)
            .with_ansi(true)
            .compact()
            .with_env_filter(filter)
            .init();
    }

    async fn start_server(app: Self) -> Result<()> {
        // Install signal handlers FIRST (before any blocking calls)
        app.shutdown.install_signal_handlers();

        // Start the OTLP gRPC server alongside the HTTP server
        let grpc_server = OtlpGrpcServer::new(
            &app.config.server,
            app.pipeline.clone(),
            app.database.clone(),
            app.cache.clone(),
            app.config.auth.clone(),
        )?;
        let shutdown_rx = app.shutdown.subscribe();
        let handle = tokio::spawn(async move {
            if let Err(e) = grpc_server.start(shutdown_rx).await {
                tracing::error!(error = %e, "OTLP gRPC server error");
            }
        });
        app.shutdown.register(handle).await;

        tracing::info!(
            http_port = app.config.server.port,
            grpc_port = app.config.server.grpc_port,
            "AIQA server listening"
        );

        let server = ApiServer::new(app);
        let app = server.start().await?;
        app.shutdown.shutdown().await;

        Ok(())
    }
}

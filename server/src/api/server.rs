//! API server initialization

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use tokio::net::TcpListener;
use tower_http::compression::CompressionLayer;
use tower_http::trace::TraceLayer;

use super::routes::{datasets, examples, experiments, health, spans};
use crate::core::CoreApp;
use crate::core::config::AuthConfig;
use crate::core::constants::{DEFAULT_BODY_LIMIT, OTLP_BODY_LIMIT};
use crate::data::cache::CacheService;
use crate::data::postgres::PostgresService;
use crate::data::search::SearchService;
use crate::domain::ingest::IngestPipeline;
use crate::domain::scoring::Scorer;

/// Shared handler state
#[derive(Clone)]
pub struct AppState {
    pub database: Arc<PostgresService>,
    pub search: Arc<SearchService>,
    pub cache: Arc<CacheService>,
    pub pipeline: Arc<IngestPipeline>,
    pub scorer: Arc<Scorer>,
    pub auth: AuthConfig,
}

pub struct ApiServer {
    app: CoreApp,
}

impl ApiServer {
    pub fn new(app: CoreApp) -> Self {
        Self { app }
    }

    /// Returns CoreApp for graceful shutdown
    pub async fn start(self) -> Result<CoreApp> {
        let app = self.app;
        let shutdown = app.shutdown.clone();

        let addr = SocketAddr::new(
            app.config.server.host.parse()?,
            app.config.server.port,
        );

        let state = AppState {
            database: app.database.clone(),
            search: app.search.clone(),
            cache: app.cache.clone(),
            pipeline: app.pipeline.clone(),
            scorer: app.scorer.clone(),
            auth: app.config.auth.clone(),
        };

        // OTLP ingestion takes larger bodies than the REST surface
        let ingest_routes = Router::new()
            .route("/span", post(spans::export))
            .layer(DefaultBodyLimit::max(OTLP_BODY_LIMIT));

        let rest_routes = Router::new()
            .route("/span", get(spans::search))
            .route("/experiment", post(experiments::create).get(experiments::list))
            .route(
                "/experiment/{id}",
                get(experiments::get)
                    .put(experiments::update)
                    .delete(experiments::delete),
            )
            .route(
                "/experiment/{id}/example/{exampleid}/scoreAndStore",
                post(experiments::score_and_store_handler),
            )
            .route("/example", post(examples::create).get(examples::list))
            .route("/dataset", post(datasets::create).get(datasets::list))
            .route(
                "/dataset/{id}",
                get(datasets::get)
                    .put(datasets::update)
                    .delete(datasets::delete),
            )
            .layer(DefaultBodyLimit::max(DEFAULT_BODY_LIMIT));

        let router = Router::new()
            .route("/health", get(health::health))
            .merge(ingest_routes)
            .merge(rest_routes)
            .layer(TraceLayer::new_for_http())
            .layer(CompressionLayer::new())
            .with_state(state);

        let listener = TcpListener::bind(addr).await?;
        tracing::debug!(%addr, "HTTP server listening");

        axum::serve(listener, router)
            .with_graceful_shutdown(shutdown.wait())
            .await?;

        Ok(app)
    }
}

//! gRPC OTLP server
//!
//! Exposes `opentelemetry.proto.collector.trace.v1.TraceService/Export` on
//! its own port and drives the same ingestion pipeline as the HTTP paths.
//! The proto types use camelCase field names with numeric enums, matching
//! the HTTP/JSON path byte-for-byte.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::sync::watch;
use tonic::transport::Server as TonicServer;
use tonic::{Request, Response, Status};

use opentelemetry_proto::tonic::collector::trace::v1::{
    ExportTraceServiceRequest, ExportTraceServiceResponse,
    trace_service_server::{TraceService, TraceServiceServer},
};

use crate::api::auth::authenticate;
use crate::core::config::{AuthConfig, ServerConfig};
use crate::core::constants::{GRPC_SHUTDOWN_GRACE_SECS, OTLP_BODY_LIMIT};
use crate::data::cache::CacheService;
use crate::data::postgres::PostgresService;
use crate::domain::ingest::IngestPipeline;

pub struct OtlpGrpcServer {
    addr: SocketAddr,
    service: OtlpTraceService,
}

impl OtlpGrpcServer {
    pub fn new(
        config: &ServerConfig,
        pipeline: Arc<IngestPipeline>,
        database: Arc<PostgresService>,
        cache: Arc<CacheService>,
        auth: AuthConfig,
    ) -> Result<Self> {
        let addr = SocketAddr::new(config.host.parse()?, config.grpc_port);
        Ok(Self {
            addr,
            service: OtlpTraceService {
                pipeline,
                database,
                cache,
                auth,
            },
        })
    }

    pub async fn start(self, shutdown_rx: watch::Receiver<bool>) -> Result<()> {
        let addr = self.addr;
        tracing::debug!(%addr, "Starting OTLP gRPC server");

        let mut graceful_rx = shutdown_rx.clone();
        let mut force_rx = shutdown_rx;

        let serve = TonicServer::builder()
            .add_service(
                TraceServiceServer::new(self.service)
                    .max_decoding_message_size(OTLP_BODY_LIMIT)
                    .max_encoding_message_size(OTLP_BODY_LIMIT),
            )
            .serve_with_shutdown(addr, async move {
                let _ = graceful_rx.wait_for(|&v| v).await;
                tracing::debug!("OTLP gRPC server shutting down");
            });
        tokio::pin!(serve);

        // Graceful stop first; dropping the server future force-stops it
        // once the grace budget is spent
        tokio::select! {
            result = &mut serve => result?,
            _ = async {
                let _ = force_rx.wait_for(|&v| v).await;
                tokio::time::sleep(Duration::from_secs(GRPC_SHUTDOWN_GRACE_SECS)).await;
            } => {
                tracing::warn!("OTLP gRPC graceful stop exceeded budget, force-stopping");
            }
        }

        Ok(())
    }
}

struct OtlpTraceService {
    pipeline: Arc<IngestPipeline>,
    database: Arc<PostgresService>,
    cache: Arc<CacheService>,
    auth: AuthConfig,
}

#[tonic::async_trait]
impl TraceService for OtlpTraceService {
    async fn export(
        &self,
        request: Request<ExportTraceServiceRequest>,
    ) -> Result<Response<ExportTraceServiceResponse>, Status> {
        let header = request
            .metadata()
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            .map(String::from);

        let ctx = authenticate(&self.database, &self.cache, &self.auth, header.as_deref())
            .await
            .map_err(|e| e.to_status())?;

        let req = request.into_inner();
        self.pipeline
            .ingest(&ctx.organisation, ctx.role, &req)
            .await
            .map_err(|e| crate::api::types::ApiError::from(e).to_status())?;

        Ok(Response::new(ExportTraceServiceResponse {
            partial_success: None,
        }))
    }
}

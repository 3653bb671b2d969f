//! OTLP ingestion entry points (HTTP handled in `routes::spans`, gRPC here)

pub mod encoding;
pub mod grpc;

pub use grpc::OtlpGrpcServer;

//! API server and routes

pub mod auth;
pub mod routes;
pub mod server;
pub mod types;

pub use routes::otlp::OtlpGrpcServer;
pub use server::ApiServer;

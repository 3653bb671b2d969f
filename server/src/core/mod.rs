//! Core application infrastructure

pub mod cli;
pub mod config;
pub mod constants;
pub mod shutdown;

pub use crate::app::CoreApp;
pub use config::{AppConfig, AuthConfig, ServerConfig, StoreConfig};
pub use shutdown::ShutdownService;

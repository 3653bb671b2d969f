//! Data storage layer
//!
//! Provides the backing-store services:
//! - `postgres` - relational store for organisational state
//! - `search` - span/example indices behind aliases
//! - `cache` - in-memory and Redis caching with the rate limiter
//! - `types` - shared data types across all backends

pub mod cache;
pub mod postgres;
pub mod search;
pub mod types;

pub use postgres::PostgresService;
pub use search::SearchService;

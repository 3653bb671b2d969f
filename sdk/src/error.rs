//! SDK error types

use thiserror::Error;

#[derive(Error, Debug)]
pub enum AiqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("HTTP transport error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Server returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("Engine failed: {0}")]
    Engine(String),

    #[error("Response decoding error: {0}")]
    Decode(String),
}

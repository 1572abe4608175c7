//! Error types for askcal-core

use thiserror::Error;

/// Main error type for askcal-core
#[derive(Error, Debug)]
pub enum Error {
    #[error("Model backend error: {0}")]
    Backend(String),

    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("JSON parsing error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tool execution error: {0}")]
    ToolExecution(String),

    #[error("Tool host error: {0}")]
    ToolHost(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("{0}")]
    Other(String),
}

/// Result type alias for askcal-core
pub type Result<T> = std::result::Result<T, Error>;

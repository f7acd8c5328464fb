//! Common error types for DMX

use thiserror::Error;

/// Common result type for DMX operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across DMX crates
#[derive(Error, Debug)]
pub enum Error {
    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encode/decode error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// TOML parse error
    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Catalog content is unusable (duplicate ids, empty file, ...)
    #[error("Catalog error: {0}")]
    Catalog(String),
}

//! Error types for Lumen.

use thiserror::Error;

/// Main error type for Lumen operations.
#[derive(Error, Debug)]
pub enum LumenError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Decode error: {0}")]
    Decode(String),

    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("GPU error: {0}")]
    Gpu(String),

    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    #[error("Resource not found: {0}")]
    NotFound(String),

    #[error("Cache error: {0}")]
    Cache(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

/// Result type alias for Lumen operations.
pub type Result<T> = std::result::Result<T, LumenError>;

//! Error types for scantrail-capture
//!
//! Defines module-specific error types using thiserror for clear error
//! propagation.

use thiserror::Error;

/// Main error type for the capture service
#[derive(Error, Debug)]
pub enum Error {
    /// Configuration file loading errors
    #[error("Configuration error: {0}")]
    Config(String),

    /// Database connection or query errors
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// HTTP server errors
    #[error("HTTP server error: {0}")]
    Http(String),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Operation not valid for the record's category
    #[error("Invalid category: {0}")]
    InvalidCategory(String),

    /// Invalid request
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// File I/O errors
    #[error("File I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<scantrail_common::Error> for Error {
    fn from(e: scantrail_common::Error) -> Self {
        match e {
            scantrail_common::Error::Database(e) => Error::Database(e),
            scantrail_common::Error::Io(e) => Error::Io(e),
            scantrail_common::Error::Config(msg) => Error::Config(msg),
            scantrail_common::Error::NotFound(msg) => Error::NotFound(msg),
            scantrail_common::Error::InvalidInput(msg) => Error::BadRequest(msg),
            scantrail_common::Error::Internal(msg) => Error::Internal(msg),
        }
    }
}

/// Convenience Result type using the capture service Error
pub type Result<T> = std::result::Result<T, Error>;

//! Error types for pdfbrief.

use thiserror::Error;

/// Result type alias using pdfbrief's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for pdfbrief operations.
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation failed (wraps sqlx::Error)
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Document not found
    #[error("Document not found: {0}")]
    DocumentNotFound(uuid::Uuid),

    /// Invalid input (bad extension, malformed body, unknown mode)
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Upload exceeds the configured size limit
    #[error("File too large (max {limit_mb}MB)")]
    PayloadTooLarge { limit_mb: u64 },

    /// Remote summarizer service failed (status, timeout, transport)
    #[error("Gateway error: {0}")]
    Gateway(String),

    /// Background job queue error
    #[error("Job error: {0}")]
    Job(String),

    /// Serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),

    /// File I/O operation failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// Whether this error means the requested resource does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Error::NotFound(_) | Error::DocumentNotFound(_))
    }

    /// Whether this error was caused by client input rather than the server.
    pub fn is_validation(&self) -> bool {
        matches!(
            self,
            Error::InvalidInput(_) | Error::PayloadTooLarge { .. } | Error::Serialization(_)
        )
    }
}

impl From<serde_json::Error> for Error {
    fn from(e: serde_json::Error) -> Self {
        Error::Serialization(e.to_string())
    }
}

impl From<reqwest::Error> for Error {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Error::Gateway(format!("request timed out: {}", e))
        } else {
            Error::Gateway(e.to_string())
        }
    }
}

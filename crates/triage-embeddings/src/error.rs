//! Embedding error types.

use std::time::Duration;

use thiserror::Error;

/// Errors that can occur during embedding operations.
#[derive(Debug, Error)]
pub enum EmbeddingError {
    /// Transport or HTTP status failure talking to the embedding service
    #[error("Embedding service error: {0}")]
    Service(String),

    /// The service answered with something that is not an embedding
    #[error("Invalid embedding response: {0}")]
    InvalidResponse(String),

    /// Client could not be configured
    #[error("Configuration error: {0}")]
    Config(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// The governor refused the call
    #[error("Embedding rate limited, retry after {:.0}s", .retry_after.as_secs_f64().ceil())]
    RateLimited { retry_after: Duration },
}

impl EmbeddingError {
    /// Whether retrying the same request could succeed.
    pub fn is_transient(&self) -> bool {
        matches!(self, EmbeddingError::Service(_))
    }
}

//! Vector index error types.

use thiserror::Error;

/// Errors that can occur during vector operations.
#[derive(Debug, Error)]
pub enum VectorError {
    /// Dimension mismatch
    #[error("Dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// Index and metadata disagree on record count
    #[error("Index holds {vectors} vectors but metadata holds {records} records")]
    Misaligned { vectors: usize, records: usize },

    /// Malformed index file
    #[error("Invalid index file: {0}")]
    Format(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Embedding error
    #[error("Embedding error: {0}")]
    Embedding(#[from] triage_embeddings::EmbeddingError),
}

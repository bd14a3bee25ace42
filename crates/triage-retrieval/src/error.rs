//! Retrieval error types.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum RetrievalError {
    #[error("Embedding error: {0}")]
    Embedding(#[from] triage_embeddings::EmbeddingError),

    #[error("Vector error: {0}")]
    Vector(#[from] triage_vector::VectorError),

    /// Failure reported by a live-search source
    #[error("Live search error: {0}")]
    LiveSearch(String),
}

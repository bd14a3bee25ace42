//! Service error types.

use std::time::Duration;

use thiserror::Error;
use triage_embeddings::EmbeddingError;
use triage_retrieval::RetrievalError;
use triage_types::KnowledgeDomain;

#[derive(Debug, Error)]
pub enum ServiceError {
    /// Domain failed to load; retrieval against it is refused
    #[error("Knowledge domain '{domain}' unavailable: {reason}")]
    Unavailable {
        domain: KnowledgeDomain,
        reason: String,
    },

    /// Embedding call refused by the rate limiter
    #[error("Rate limit exceeded. Please try again in {} seconds.", .retry_after.as_secs_f64().ceil())]
    RateLimited { retry_after: Duration },

    #[error("Retrieval error: {0}")]
    Retrieval(RetrievalError),

    #[error("Embedding error: {0}")]
    Embedding(EmbeddingError),

    #[error("Configuration error: {0}")]
    Config(#[from] triage_types::TriageError),

    #[error("Reload task failed: {0}")]
    Task(String),
}

impl ServiceError {
    pub fn is_rate_limited(&self) -> bool {
        matches!(self, ServiceError::RateLimited { .. })
    }
}

impl From<EmbeddingError> for ServiceError {
    fn from(e: EmbeddingError) -> Self {
        match e {
            EmbeddingError::RateLimited { retry_after } => ServiceError::RateLimited { retry_after },
            other => ServiceError::Embedding(other),
        }
    }
}

impl From<RetrievalError> for ServiceError {
    fn from(e: RetrievalError) -> Self {
        match e {
            RetrievalError::Embedding(inner) => inner.into(),
            other => ServiceError::Retrieval(other),
        }
    }
}

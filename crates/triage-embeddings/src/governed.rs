//! Embedding through the call governor.
//!
//! Every query embedding is billed against the shared rate limiter and
//! cached by text, so repeated symptom lists do not reach the service.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tracing::{debug, warn};

use triage_governor::{CallGovernor, CallOutcome, Governable, Governed};

use crate::error::EmbeddingError;
use crate::model::{Embedding, EmbeddingModel, ModelInfo};

/// `Governable` adapter over an embedding model.
struct EmbedCall {
    name: String,
    model: Arc<dyn EmbeddingModel>,
}

#[async_trait]
impl Governable for EmbedCall {
    type Args = String;
    type Output = Embedding;
    type Error = EmbeddingError;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, text: String) -> Result<Embedding, EmbeddingError> {
        self.model.embed(&text).await
    }
}

/// An `EmbeddingModel` whose calls are cached and rate limited.
pub struct GovernedEmbedder {
    governed: Governed<EmbedCall>,
    info: ModelInfo,
}

impl GovernedEmbedder {
    /// Wrap `model` with the governor's configured TTL and default identifier.
    pub fn new(model: Arc<dyn EmbeddingModel>, governor: &Arc<CallGovernor>) -> Self {
        let identifier = governor.default_identifier().to_string();
        Self::with_options(model, governor, governor.default_ttl(), identifier)
    }

    pub fn with_options(
        model: Arc<dyn EmbeddingModel>,
        governor: &Arc<CallGovernor>,
        ttl: Duration,
        identifier: impl Into<String>,
    ) -> Self {
        let info = model.info().clone();
        let call = EmbedCall {
            name: format!("embed:{}", info.name),
            model,
        };
        Self {
            governed: governor.with_governance(ttl, identifier, call),
            info,
        }
    }

    pub fn identifier(&self) -> &str {
        self.governed.identifier()
    }
}

#[async_trait]
impl EmbeddingModel for GovernedEmbedder {
    fn info(&self) -> &ModelInfo {
        &self.info
    }

    async fn embed(&self, text: &str) -> Result<Embedding, EmbeddingError> {
        match self.governed.call(text.to_string()).await {
            CallOutcome::Success { value, cached } => {
                debug!(cached, "Query embedded");
                Ok(value)
            }
            CallOutcome::Failed(e) => Err(e),
            CallOutcome::RateLimited(rejected) => {
                warn!(
                    identifier = %rejected.identifier,
                    retry_after_secs = rejected.retry_after_secs(),
                    "Embedding call rate limited"
                );
                Err(EmbeddingError::RateLimited {
                    retry_after: rejected.retry_after,
                })
            }
        }
    }
}

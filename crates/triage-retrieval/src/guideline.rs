//! Single-domain guideline retrieval.

use std::sync::Arc;

use tracing::{debug, warn};
use triage_embeddings::EmbeddingModel;
use triage_types::{KnowledgeDomain, RetrievalHit};
use triage_vector::SharedKnowledgeBase;

use crate::error::RetrievalError;

/// Query text embedded for a symptom list.
pub fn build_query(symptom_terms: &[String]) -> String {
    format!("Patient symptoms: {}.", symptom_terms.join(", "))
}

/// Retrieves guideline records for symptom terms from one knowledge domain.
///
/// The embedder must be the model (and dimension) the domain's index was
/// built with.
pub struct GuidelineRetriever {
    domain: KnowledgeDomain,
    knowledge: Arc<SharedKnowledgeBase>,
    embedder: Arc<dyn EmbeddingModel>,
}

impl GuidelineRetriever {
    pub fn new(
        domain: KnowledgeDomain,
        knowledge: Arc<SharedKnowledgeBase>,
        embedder: Arc<dyn EmbeddingModel>,
    ) -> Self {
        Self {
            domain,
            knowledge,
            embedder,
        }
    }

    pub fn domain(&self) -> KnowledgeDomain {
        self.domain
    }

    pub fn knowledge(&self) -> &Arc<SharedKnowledgeBase> {
        &self.knowledge
    }

    /// Top-`top_k` records nearest to the symptom query, nearest first.
    ///
    /// No terms or an empty knowledge base yields an empty result without
    /// embedding anything.
    pub async fn retrieve(
        &self,
        symptom_terms: &[String],
        top_k: usize,
    ) -> Result<Vec<RetrievalHit>, RetrievalError> {
        if symptom_terms.is_empty() {
            debug!(domain = %self.domain, "No symptom terms, skipping retrieval");
            return Ok(Vec::new());
        }

        let kb = self.knowledge.snapshot();
        if kb.is_empty() {
            debug!(domain = %self.domain, "Knowledge base empty, skipping retrieval");
            return Ok(Vec::new());
        }

        let query = build_query(symptom_terms);
        let embedding = self.embedder.embed(&query).await?;
        let results = kb.search(&embedding, top_k)?;

        let mut hits = Vec::with_capacity(results.len());
        for result in results {
            match kb.record(result.position) {
                Some(record) => hits.push(RetrievalHit::new(record.clone(), result.distance)),
                None => warn!(
                    domain = %self.domain,
                    position = result.position,
                    records = kb.len(),
                    "Index returned a position with no metadata record, skipping"
                ),
            }
        }

        debug!(domain = %self.domain, query = %query, hits = hits.len(), "Guidelines retrieved");
        Ok(hits)
    }
}

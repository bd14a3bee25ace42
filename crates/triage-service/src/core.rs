//! The triage core facade.
//!
//! Built once at startup and shared (behind `Arc`) by whatever serves
//! requests. A domain that fails to load is marked unavailable; the rest of
//! the core keeps serving.

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;

use tracing::{error, info, warn};

use triage_embeddings::{EmbeddingModel, GovernedEmbedder, HttpEmbedder, HttpEmbedderConfig};
use triage_governor::{CacheStats, CallGovernor, Governable, Governed, RateLimitStats};
use triage_retrieval::{
    GuidelineRetriever, HybridResponse, HybridRetriever, HybridStats, LiveSearch, UsagePolicy,
};
use triage_types::{KnowledgeDomain, RetrievalHit, Settings};
use triage_vector::{KnowledgeBase, SharedKnowledgeBase, VectorError};

use crate::error::ServiceError;
use crate::status::DomainStatus;

struct DomainSlot {
    knowledge: Arc<SharedKnowledgeBase>,
    hybrid: HybridRetriever,
    /// Load failure, `None` while serving
    unavailable: RwLock<Option<String>>,
}

impl DomainSlot {
    fn unavailable_reason(&self) -> Option<String> {
        self.unavailable
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn set_unavailable(&self, reason: Option<String>) {
        *self.unavailable.write().unwrap_or_else(PoisonError::into_inner) = reason;
    }
}

pub struct TriageCore {
    settings: Settings,
    governor: Arc<CallGovernor>,
    embedder: Arc<dyn EmbeddingModel>,
    domains: HashMap<KnowledgeDomain, DomainSlot>,
}

fn load_domain(
    settings: &Settings,
    domain: KnowledgeDomain,
    dimension: usize,
) -> Result<KnowledgeBase, VectorError> {
    let kb = KnowledgeBase::load(
        domain,
        settings.domains.paths(domain),
        settings.retrieval.strict_alignment,
    )?;
    if !kb.is_empty() && kb.dimension() != dimension {
        return Err(VectorError::DimensionMismatch {
            expected: dimension,
            actual: kb.dimension(),
        });
    }
    Ok(kb)
}

impl TriageCore {
    /// Build the core with the configured HTTP embedding service.
    pub fn from_settings(
        settings: Settings,
        live: Option<Arc<dyn LiveSearch>>,
    ) -> Result<Self, ServiceError> {
        let config = HttpEmbedderConfig::from(&settings.embedding);
        let embedder = HttpEmbedder::new(config)?;
        Ok(Self::new(settings, Arc::new(embedder), live))
    }

    /// Build the core around `embedder`.
    ///
    /// Embedding calls are routed through the core's governor. Domains are
    /// loaded here; failures are logged and leave the domain unavailable.
    pub fn new(
        settings: Settings,
        embedder: Arc<dyn EmbeddingModel>,
        live: Option<Arc<dyn LiveSearch>>,
    ) -> Self {
        let governor = Arc::new(CallGovernor::new(&settings.governor));
        let embedder: Arc<dyn EmbeddingModel> = Arc::new(GovernedEmbedder::new(embedder, &governor));
        let dimension = embedder.info().dimension;
        let policy = Arc::new(UsagePolicy::new(settings.hybrid.usage_rate));

        let mut domains = HashMap::new();
        for domain in KnowledgeDomain::ALL {
            let (kb, unavailable) = match load_domain(&settings, domain, dimension) {
                Ok(kb) => (kb, None),
                Err(e) => {
                    error!(domain = %domain, error = %e, "Knowledge domain failed to load, marking unavailable");
                    (KnowledgeBase::empty(domain, dimension), Some(e.to_string()))
                }
            };

            let knowledge = Arc::new(SharedKnowledgeBase::new(kb));
            let retriever = Arc::new(GuidelineRetriever::new(
                domain,
                Arc::clone(&knowledge),
                Arc::clone(&embedder),
            ));
            let hybrid = HybridRetriever::new(retriever, live.clone(), Arc::clone(&policy));

            domains.insert(
                domain,
                DomainSlot {
                    knowledge,
                    hybrid,
                    unavailable: RwLock::new(unavailable),
                },
            );
        }

        info!(
            model = %embedder.info().name,
            dimension,
            live_search = live.is_some(),
            "Triage core ready"
        );

        Self {
            settings,
            governor,
            embedder,
            domains,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn governor(&self) -> &Arc<CallGovernor> {
        &self.governor
    }

    /// The governed embedder used for retrieval queries.
    pub fn embedder(&self) -> &Arc<dyn EmbeddingModel> {
        &self.embedder
    }

    fn slot(&self, domain: KnowledgeDomain) -> Result<&DomainSlot, ServiceError> {
        let slot = self
            .domains
            .get(&domain)
            .ok_or_else(|| ServiceError::Unavailable {
                domain,
                reason: "not configured".to_string(),
            })?;
        match slot.unavailable_reason() {
            Some(reason) => Err(ServiceError::Unavailable { domain, reason }),
            None => Ok(slot),
        }
    }

    fn top_k(&self, top_k: Option<usize>) -> usize {
        top_k.unwrap_or(self.settings.retrieval.default_top_k)
    }

    /// Guideline records nearest to `symptom_terms` in `domain`.
    pub async fn retrieve_guidelines(
        &self,
        domain: KnowledgeDomain,
        symptom_terms: &[String],
        top_k: Option<usize>,
    ) -> Result<Vec<RetrievalHit>, ServiceError> {
        let slot = self.slot(domain)?;
        let hits = slot
            .hybrid
            .primary()
            .retrieve(symptom_terms, self.top_k(top_k))
            .await?;
        Ok(hits)
    }

    /// Local guidelines for `mode`, enriched from live search when selected.
    pub async fn retrieve_hybrid(
        &self,
        symptom_terms: &[String],
        mode: KnowledgeDomain,
        top_k: Option<usize>,
    ) -> Result<HybridResponse, ServiceError> {
        let slot = self.slot(mode)?;
        let response = slot
            .hybrid
            .retrieve_multi_source(symptom_terms, mode, self.top_k(top_k))
            .await?;
        Ok(response)
    }

    /// Wrap a caller's expensive call with this core's cache and limiter.
    ///
    /// `None` takes the configured TTL or default identifier.
    pub fn with_governance<G: Governable>(
        &self,
        ttl: Option<Duration>,
        identifier: Option<&str>,
        inner: G,
    ) -> Governed<G> {
        let ttl = ttl.unwrap_or_else(|| self.governor.default_ttl());
        let identifier = identifier.unwrap_or_else(|| self.governor.default_identifier());
        self.governor.with_governance(ttl, identifier, inner)
    }

    pub fn cache_stats(&self) -> CacheStats {
        self.governor.cache_stats()
    }

    pub fn rate_limit_stats(&self, identifier: Option<&str>) -> RateLimitStats {
        let identifier = identifier.unwrap_or_else(|| self.governor.default_identifier());
        self.governor.rate_limit_stats(identifier)
    }

    pub fn clear_cache(&self) -> usize {
        self.governor.clear_cache()
    }

    pub fn clear_rate_limits(&self, identifier: Option<&str>) {
        self.governor.clear_rate_limits(identifier)
    }

    /// Hybrid stats. The usage counter is shared by both domains.
    pub fn hybrid_stats(&self) -> HybridStats {
        self.domains
            .get(&KnowledgeDomain::Chw)
            .or_else(|| self.domains.values().next())
            .map(|slot| slot.hybrid.stats())
            .unwrap_or(HybridStats {
                secondary_enabled: false,
                query_count: 0,
                usage_rate: self.settings.hybrid.usage_rate,
            })
    }

    pub fn domain_status(&self, domain: KnowledgeDomain) -> Option<DomainStatus> {
        let slot = self.domains.get(&domain)?;
        let error = slot.unavailable_reason();
        let kb = slot.knowledge.snapshot();
        let alignment = kb.alignment();
        Some(DomainStatus {
            domain,
            available: error.is_none(),
            records: kb.len(),
            dimension: kb.dimension(),
            vectors_on_disk: alignment.vectors,
            records_on_disk: alignment.records,
            aligned: alignment.is_aligned(),
            loaded_at: error.is_none().then(|| kb.loaded_at()),
            error,
        })
    }

    pub fn status(&self) -> Vec<DomainStatus> {
        KnowledgeDomain::ALL
            .iter()
            .filter_map(|d| self.domain_status(*d))
            .collect()
    }

    /// Reload `domain` from disk and swap it in.
    ///
    /// On failure the previous knowledge base keeps serving. A domain that
    /// was unavailable stays unavailable with the new reason.
    pub async fn reload_domain(&self, domain: KnowledgeDomain) -> Result<DomainStatus, ServiceError> {
        let slot = self.domains.get(&domain).ok_or_else(|| ServiceError::Unavailable {
            domain,
            reason: "not configured".to_string(),
        })?;

        let settings = self.settings.clone();
        let dimension = self.embedder.info().dimension;
        let loaded = tokio::task::spawn_blocking(move || load_domain(&settings, domain, dimension))
            .await
            .map_err(|e| ServiceError::Task(e.to_string()))?;

        match loaded {
            Ok(kb) => {
                let records = kb.len();
                slot.knowledge.swap(kb);
                slot.set_unavailable(None);
                info!(domain = %domain, records, "Knowledge domain reloaded");
            }
            Err(e) => {
                let reason = e.to_string();
                if slot.unavailable_reason().is_some() {
                    slot.set_unavailable(Some(reason.clone()));
                }
                warn!(domain = %domain, error = %reason, "Reload failed, previous knowledge base kept");
                return Err(ServiceError::Unavailable { domain, reason });
            }
        }

        self.domain_status(domain).ok_or(ServiceError::Unavailable {
            domain,
            reason: "not configured".to_string(),
        })
    }
}

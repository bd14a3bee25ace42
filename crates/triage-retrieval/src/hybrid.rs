//! Multi-source retrieval: local guidelines plus optional live search.
//!
//! Local retrieval always runs first. The live source is consulted only
//! when `UsagePolicy` selects the query, and any failure there degrades to
//! local-only results.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use triage_types::{KnowledgeDomain, RetrievalHit};

use crate::error::RetrievalError;
use crate::guideline::GuidelineRetriever;
use crate::live::{LiveSearch, SecondaryResults};
use crate::policy::UsagePolicy;

/// Terms that make a chw-mode query worth a drug lookup.
const DRUG_TERMS: [&str; 4] = ["drug", "medication", "medicine", "pill"];

/// Hit counts per source, for observability.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceCounts {
    pub local_guidelines: usize,
    pub literature: usize,
    pub drug_databases: usize,
    pub clinical_trials: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HybridResponse {
    pub local_results: Vec<RetrievalHit>,
    pub secondary_results: SecondaryResults,
    /// Live results formatted as prompt context; empty when not enriched
    pub merged_context: String,
    pub source_counts: SourceCounts,
    /// Whether live results were merged in
    pub enriched: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HybridStats {
    pub secondary_enabled: bool,
    pub query_count: u64,
    pub usage_rate: f64,
}

pub struct HybridRetriever {
    primary: Arc<GuidelineRetriever>,
    secondary: Option<Arc<dyn LiveSearch>>,
    policy: Arc<UsagePolicy>,
}

impl HybridRetriever {
    pub fn new(
        primary: Arc<GuidelineRetriever>,
        secondary: Option<Arc<dyn LiveSearch>>,
        policy: Arc<UsagePolicy>,
    ) -> Self {
        Self {
            primary,
            secondary,
            policy,
        }
    }

    pub fn primary(&self) -> &Arc<GuidelineRetriever> {
        &self.primary
    }

    /// Whether this query should be enriched. Always false without a live source.
    pub fn should_use_secondary(&self, symptom_terms: &[String], mode: KnowledgeDomain) -> bool {
        self.secondary.is_some() && self.policy.should_enrich(symptom_terms, mode)
    }

    pub async fn retrieve_multi_source(
        &self,
        symptom_terms: &[String],
        mode: KnowledgeDomain,
        top_k: usize,
    ) -> Result<HybridResponse, RetrievalError> {
        let local_results = self.primary.retrieve(symptom_terms, top_k).await?;

        let mut response = HybridResponse {
            source_counts: SourceCounts {
                local_guidelines: local_results.len(),
                ..Default::default()
            },
            local_results,
            ..Default::default()
        };

        let secondary = match &self.secondary {
            Some(s) if self.should_use_secondary(symptom_terms, mode) => s,
            _ => {
                debug!(mode = %mode, "Local guidelines only");
                return Ok(response);
            }
        };

        match query_secondary(secondary.as_ref(), symptom_terms, mode).await {
            Ok(results) => {
                response.source_counts.literature = results.literature.len();
                response.source_counts.clinical_trials = results.guidelines.len();
                response.source_counts.drug_databases = results.drugs.len();
                response.merged_context = secondary.format_for_prompt(&results);
                response.secondary_results = results;
                response.enriched = true;
                info!(
                    mode = %mode,
                    literature = response.source_counts.literature,
                    guidelines = response.source_counts.clinical_trials,
                    drugs = response.source_counts.drug_databases,
                    "Live search enrichment added"
                );
            }
            Err(e) => {
                warn!(mode = %mode, error = %e, "Live search failed, using local guidelines only");
            }
        }

        Ok(response)
    }

    pub fn stats(&self) -> HybridStats {
        HybridStats {
            secondary_enabled: self.secondary.is_some(),
            query_count: self.policy.query_count(),
            usage_rate: self.policy.usage_rate(),
        }
    }
}

fn mentions_drugs(symptom_terms: &[String]) -> bool {
    let joined = symptom_terms.join(" ").to_lowercase();
    DRUG_TERMS.iter().any(|t| joined.contains(t))
}

async fn query_secondary(
    secondary: &dyn LiveSearch,
    symptom_terms: &[String],
    mode: KnowledgeDomain,
) -> Result<SecondaryResults, RetrievalError> {
    let (literature, guidelines) = futures::try_join!(
        secondary.search_literature(symptom_terms),
        secondary.search_guidelines(symptom_terms),
    )?;
    let drugs = if mode == KnowledgeDomain::Clinical || mentions_drugs(symptom_terms) {
        secondary.search_drug_info(symptom_terms).await?
    } else {
        Vec::new()
    };

    Ok(SecondaryResults {
        literature,
        guidelines,
        drugs,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::live::LiveResult;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use triage_embeddings::MockEmbedder;
    use triage_types::{GuidelineEntry, GuidelineRecord};
    use triage_vector::{FlatL2Index, KnowledgeBase, SharedKnowledgeBase, VectorIndex};

    const DIM: usize = 32;

    #[derive(Default)]
    struct FakeLiveSearch {
        literature_calls: AtomicUsize,
        drug_calls: AtomicUsize,
        failing: AtomicBool,
    }

    fn live(title: &str) -> LiveResult {
        LiveResult {
            title: title.to_string(),
            content: String::new(),
            source: "pubmed".to_string(),
            url: None,
            relevance: None,
        }
    }

    #[async_trait]
    impl LiveSearch for FakeLiveSearch {
        async fn search_literature(&self, _terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
            self.literature_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![live("Fever in the tropics"), live("Paediatric malaria")])
        }

        async fn search_guidelines(&self, _terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
            if self.failing.load(Ordering::SeqCst) {
                return Err(RetrievalError::LiveSearch("upstream 502".to_string()));
            }
            Ok(vec![live("WHO IMCI chart")])
        }

        async fn search_drug_info(&self, _terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
            self.drug_calls.fetch_add(1, Ordering::SeqCst);
            Ok(vec![live("Artemether-lumefantrine")])
        }

        fn format_for_prompt(&self, results: &SecondaryResults) -> String {
            format!("{} live results", results.total())
        }
    }

    fn primary() -> Arc<GuidelineRetriever> {
        let embedder = Arc::new(MockEmbedder::new(DIM));
        let record = GuidelineRecord::Guideline(GuidelineEntry {
            source_document_name: "CHW Manual".to_string(),
            section_title: String::new(),
            age_group: String::new(),
            subsection_code: String::new(),
            subsection_title: String::new(),
            case: "Fever".to_string(),
            history: vec![],
            examination: vec![],
            clinical_judgement: String::new(),
            actions: vec![],
            notes: vec![],
            original_text_chunk: "fever".to_string(),
        });
        let mut index = FlatL2Index::new(DIM);
        index.add(&embedder.vector_for("fever")).unwrap();
        let kb = KnowledgeBase::from_parts(KnowledgeDomain::Chw, index, vec![record], true).unwrap();
        Arc::new(GuidelineRetriever::new(
            KnowledgeDomain::Chw,
            Arc::new(SharedKnowledgeBase::new(kb)),
            embedder,
        ))
    }

    fn terms(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn hybrid(live: Option<Arc<FakeLiveSearch>>) -> HybridRetriever {
        let secondary = live.map(|l| l as Arc<dyn LiveSearch>);
        HybridRetriever::new(primary(), secondary, Arc::new(UsagePolicy::new(0.2)))
    }

    #[tokio::test]
    async fn test_simple_queries_enriched_periodically() {
        let fake = Arc::new(FakeLiveSearch::default());
        let h = hybrid(Some(fake.clone()));

        let mut enriched = 0;
        for _ in 0..10 {
            let r = h
                .retrieve_multi_source(&terms(&["fever"]), KnowledgeDomain::Chw, 3)
                .await
                .unwrap();
            assert_eq!(r.source_counts.local_guidelines, 1);
            if r.enriched {
                enriched += 1;
            }
        }
        assert_eq!(enriched, 2);
        assert_eq!(fake.literature_calls.load(Ordering::SeqCst), 2);
        assert_eq!(h.stats().query_count, 10);
    }

    #[tokio::test]
    async fn test_complex_case_enriched_without_drugs() {
        let fake = Arc::new(FakeLiveSearch::default());
        let h = hybrid(Some(fake.clone()));

        let r = h
            .retrieve_multi_source(&terms(&["fever", "cough", "rash"]), KnowledgeDomain::Chw, 3)
            .await
            .unwrap();
        assert!(r.enriched);
        assert_eq!(
            r.source_counts,
            SourceCounts {
                local_guidelines: 1,
                literature: 2,
                drug_databases: 0,
                clinical_trials: 1,
            }
        );
        assert_eq!(r.merged_context, "3 live results");
        assert_eq!(fake.drug_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_clinical_mode_queries_drugs() {
        let fake = Arc::new(FakeLiveSearch::default());
        let h = hybrid(Some(fake.clone()));

        let r = h
            .retrieve_multi_source(&terms(&["fever"]), KnowledgeDomain::Clinical, 3)
            .await
            .unwrap();
        assert!(r.enriched);
        assert_eq!(r.source_counts.drug_databases, 1);
        assert_eq!(r.secondary_results.drugs[0].title, "Artemether-lumefantrine");
    }

    #[tokio::test]
    async fn test_drug_mention_triggers_drug_lookup() {
        let fake = Arc::new(FakeLiveSearch::default());
        let h = hybrid(Some(fake.clone()));

        h.retrieve_multi_source(
            &terms(&["fever", "took Medication", "vomiting"]),
            KnowledgeDomain::Chw,
            3,
        )
        .await
        .unwrap();
        assert_eq!(fake.drug_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_live_failure_falls_back_to_local() {
        let fake = Arc::new(FakeLiveSearch::default());
        fake.failing.store(true, Ordering::SeqCst);
        let h = hybrid(Some(fake));

        let r = h
            .retrieve_multi_source(&terms(&["fever"]), KnowledgeDomain::Clinical, 3)
            .await
            .unwrap();
        assert!(!r.enriched);
        assert_eq!(r.local_results.len(), 1);
        assert!(r.secondary_results.is_empty());
        assert!(r.merged_context.is_empty());
        assert_eq!(r.source_counts.literature, 0);
    }

    #[tokio::test]
    async fn test_without_live_source() {
        let h = hybrid(None);
        for _ in 0..5 {
            let r = h
                .retrieve_multi_source(&terms(&["a", "b", "c"]), KnowledgeDomain::Clinical, 3)
                .await
                .unwrap();
            assert!(!r.enriched);
        }
        assert_eq!(
            h.stats(),
            HybridStats {
                secondary_enabled: false,
                query_count: 0,
                usage_rate: 0.2,
            }
        );
    }
}

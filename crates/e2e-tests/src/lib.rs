//! End-to-end test infrastructure for the triage core.
//!
//! Provides a shared TestHarness that builds real knowledge-base files in a
//! temp directory with a deterministic embedder, plus a scriptable live
//! search source.

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;

use triage_embeddings::MockEmbedder;
use triage_retrieval::{LiveResult, LiveSearch, RetrievalError, SecondaryResults};
use triage_service::TriageCore;
use triage_types::{
    DiseaseInfo, DomainPaths, GuidelineEntry, GuidelineRecord, KnowledgeDomain, Settings,
    TextbookEntry,
};
use triage_vector::build_knowledge_base;

/// Embedding dimension used by every harness.
pub const TEST_DIMENSION: usize = 256;

/// Shared test harness for E2E tests.
pub struct TestHarness {
    /// Keeps temp dir alive for the lifetime of the harness
    pub _temp_dir: tempfile::TempDir,
    /// Settings pointing every domain into the temp dir
    pub settings: Settings,
    /// Embedder used both to build indexes and to serve queries
    pub embedder: Arc<MockEmbedder>,
}

impl TestHarness {
    pub fn new() -> Self {
        let temp_dir = tempfile::TempDir::new().expect("Failed to create temp dir");

        let mut settings = Settings::default();
        settings.embedding.dimension = TEST_DIMENSION;
        for domain in KnowledgeDomain::ALL {
            let dir = temp_dir.path().join(format!("kb_{}", domain));
            let paths = DomainPaths {
                index_path: dir.join(format!("{}.index", domain)),
                metadata_path: dir.join(format!("{}_metadata.json", domain)),
            };
            match domain {
                KnowledgeDomain::Chw => settings.domains.chw = paths,
                KnowledgeDomain::Clinical => settings.domains.clinical = paths,
            }
        }

        Self {
            _temp_dir: temp_dir,
            settings,
            embedder: Arc::new(MockEmbedder::new(TEST_DIMENSION)),
        }
    }

    pub fn paths(&self, domain: KnowledgeDomain) -> &DomainPaths {
        self.settings.domains.paths(domain)
    }

    /// Build a domain's index and metadata files from `records`.
    pub async fn build_domain(&self, domain: KnowledgeDomain, records: &[GuidelineRecord]) {
        build_knowledge_base(records, self.embedder.as_ref(), self.paths(domain))
            .await
            .expect("Failed to build knowledge base");
    }

    /// Build both domains from the standard fixtures.
    pub async fn build_all(&self) {
        self.build_domain(KnowledgeDomain::Chw, &chw_records()).await;
        self.build_domain(KnowledgeDomain::Clinical, &clinical_records())
            .await;
    }

    /// Start a core over the current files.
    pub fn core(&self, live: Option<Arc<dyn LiveSearch>>) -> TriageCore {
        TriageCore::new(self.settings.clone(), self.embedder.clone(), live)
    }

    /// Embedding calls that reached the model (index builds included).
    pub fn embed_calls(&self) -> usize {
        self.embedder.call_count()
    }
}

impl Default for TestHarness {
    fn default() -> Self {
        Self::new()
    }
}

pub fn guideline(case: &str, actions: &[&str], chunk: &str) -> GuidelineRecord {
    GuidelineRecord::Guideline(GuidelineEntry {
        source_document_name: "National CHW Standing Orders".to_string(),
        section_title: "Child health".to_string(),
        age_group: "2 months - 5 years".to_string(),
        subsection_code: String::new(),
        subsection_title: case.to_string(),
        case: case.to_string(),
        history: vec![],
        examination: vec![],
        clinical_judgement: String::new(),
        actions: actions.iter().map(|a| a.to_string()).collect(),
        notes: vec![],
        original_text_chunk: chunk.to_string(),
    })
}

pub fn textbook(disease: &str, symptoms: &[&str], chunk: &str) -> GuidelineRecord {
    GuidelineRecord::Textbook(TextbookEntry {
        source_document_name: "Clinical Medicine Handbook".to_string(),
        disease_info: DiseaseInfo {
            disease: disease.to_string(),
            category: Some("infectious".to_string()),
            description: String::new(),
            symptoms: symptoms.iter().map(|s| s.to_string()).collect(),
            extra: Default::default(),
        },
        original_text_chunk: chunk.to_string(),
    })
}

pub fn chw_records() -> Vec<GuidelineRecord> {
    vec![
        guideline(
            "Fever",
            &["Do malaria RDT", "Give paracetamol"],
            "fever hot body high temperature",
        ),
        guideline(
            "Cough or difficult breathing",
            &["Count breaths", "Refer if chest indrawing"],
            "cough difficult breathing fast breathing",
        ),
        guideline(
            "Diarrhoea",
            &["Give ORS and zinc"],
            "diarrhoea loose stools dehydration",
        ),
        guideline(
            "Convulsions",
            &["Refer urgently"],
            "convulsions fits unconscious",
        ),
    ]
}

pub fn clinical_records() -> Vec<GuidelineRecord> {
    vec![
        textbook(
            "Malaria",
            &["fever", "chills", "headache"],
            "malaria fever chills headache sweating",
        ),
        textbook(
            "Pneumonia",
            &["cough", "fever", "chest pain"],
            "pneumonia cough chest pain sputum",
        ),
        textbook(
            "Gastroenteritis",
            &["diarrhoea", "vomiting"],
            "gastroenteritis diarrhoea vomiting abdominal cramps",
        ),
    ]
}

pub fn terms(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| s.to_string()).collect()
}

/// Live search source with call counters and a failure switch.
#[derive(Default)]
pub struct StubLiveSearch {
    pub literature_calls: AtomicUsize,
    pub guideline_calls: AtomicUsize,
    pub drug_calls: AtomicUsize,
    pub failing: AtomicBool,
}

impl StubLiveSearch {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of enriched retrievals (each issues one literature query).
    pub fn enrichments(&self) -> usize {
        self.literature_calls.load(Ordering::SeqCst)
    }

    fn result(title: &str, source: &str) -> LiveResult {
        LiveResult {
            title: title.to_string(),
            content: format!("Summary of {}", title),
            source: source.to_string(),
            url: None,
            relevance: Some(0.9),
        }
    }
}

#[async_trait]
impl LiveSearch for StubLiveSearch {
    async fn search_literature(&self, terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
        self.literature_calls.fetch_add(1, Ordering::SeqCst);
        if self.failing.load(Ordering::SeqCst) {
            return Err(RetrievalError::LiveSearch("search backend timeout".to_string()));
        }
        Ok(terms
            .iter()
            .map(|t| Self::result(&format!("Review: {}", t), "pubmed"))
            .collect())
    }

    async fn search_guidelines(&self, _terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
        self.guideline_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Self::result("WHO IMCI chart booklet", "who")])
    }

    async fn search_drug_info(&self, _terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError> {
        self.drug_calls.fetch_add(1, Ordering::SeqCst);
        Ok(vec![Self::result("Paracetamol dosing", "formulary")])
    }

    fn format_for_prompt(&self, results: &SecondaryResults) -> String {
        let mut out = String::new();
        for r in results
            .literature
            .iter()
            .chain(&results.guidelines)
            .chain(&results.drugs)
        {
            out.push_str(&format!("- {} ({})\n", r.title, r.source));
        }
        out
    }
}

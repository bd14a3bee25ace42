//! Live-search collaborator interface.
//!
//! A live source (literature search, guideline portals, drug databases) is
//! slow and billed per call, so `HybridRetriever` only consults it when the
//! usage policy says so.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::RetrievalError;

/// One result from a live source.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LiveResult {
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Publisher or database the result came from
    #[serde(default)]
    pub source: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub relevance: Option<f32>,
}

/// Results of the live sub-queries for one retrieval.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SecondaryResults {
    pub literature: Vec<LiveResult>,
    pub guidelines: Vec<LiveResult>,
    pub drugs: Vec<LiveResult>,
}

impl SecondaryResults {
    pub fn is_empty(&self) -> bool {
        self.literature.is_empty() && self.guidelines.is_empty() && self.drugs.is_empty()
    }

    pub fn total(&self) -> usize {
        self.literature.len() + self.guidelines.len() + self.drugs.len()
    }
}

#[async_trait]
pub trait LiveSearch: Send + Sync {
    async fn search_literature(&self, terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError>;

    async fn search_guidelines(&self, terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError>;

    async fn search_drug_info(&self, terms: &[String]) -> Result<Vec<LiveResult>, RetrievalError>;

    /// Summarize results as prompt context for a generation model.
    fn format_for_prompt(&self, results: &SecondaryResults) -> String;
}

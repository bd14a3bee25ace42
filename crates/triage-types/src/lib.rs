//! # triage-types
//!
//! Shared domain types for the clinical triage retrieval core.
//!
//! This crate defines the data structures used throughout the system:
//! - Guideline records: immutable chunks of guideline or textbook text
//! - Retrieval hits: a record plus its distance to a query
//! - Knowledge domains: the community-health-worker and clinical-support bases
//! - Settings: layered configuration
//!
//! ## Usage
//!
//! ```rust
//! use triage_types::{KnowledgeDomain, SourceType};
//!
//! let domain: KnowledgeDomain = "chw".parse().unwrap();
//! assert_eq!(domain, KnowledgeDomain::Chw);
//! ```

pub mod config;
pub mod domain;
pub mod error;
pub mod record;

pub use config::{
    DomainPaths, DomainSettings, EmbeddingSettings, GovernorSettings, HybridSettings,
    RetrievalSettings, Settings,
};
pub use domain::KnowledgeDomain;
pub use error::TriageError;
pub use record::{DiseaseInfo, GuidelineEntry, GuidelineRecord, RetrievalHit, SourceType, TextbookEntry};

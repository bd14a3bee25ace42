//! Per-domain health.

use chrono::{DateTime, Utc};
use serde::Serialize;
use triage_types::KnowledgeDomain;

/// Snapshot of a knowledge domain for health checks.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DomainStatus {
    pub domain: KnowledgeDomain,
    pub available: bool,
    /// Records being served
    pub records: usize,
    pub dimension: usize,
    /// Vector count found on disk
    pub vectors_on_disk: usize,
    /// Metadata record count found on disk
    pub records_on_disk: usize,
    pub aligned: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    /// Why the domain is unavailable
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

//! Knowledge domains.
//!
//! Each domain owns one pre-built vector index and its metadata file.
//! The same enum doubles as the hybrid retrieval mode.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::TriageError;

/// A knowledge domain served by the retrieval core.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KnowledgeDomain {
    /// Community-health-worker guidelines (CHO/CHEW)
    Chw,
    /// Clinical-support guidelines and textbook entries
    Clinical,
}

impl KnowledgeDomain {
    /// All domains, in startup order.
    pub const ALL: [KnowledgeDomain; 2] = [KnowledgeDomain::Chw, KnowledgeDomain::Clinical];

    pub fn as_str(&self) -> &'static str {
        match self {
            KnowledgeDomain::Chw => "chw",
            KnowledgeDomain::Clinical => "clinical",
        }
    }
}

impl std::fmt::Display for KnowledgeDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for KnowledgeDomain {
    type Err = TriageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "chw" => Ok(KnowledgeDomain::Chw),
            "clinical" => Ok(KnowledgeDomain::Clinical),
            other => Err(TriageError::UnknownDomain(other.to_string())),
        }
    }
}

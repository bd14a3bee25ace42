//! Error types shared across the triage core.

use thiserror::Error;

/// Unified error type for configuration and domain parsing.
#[derive(Debug, Error)]
pub enum TriageError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Unknown knowledge domain or retrieval mode
    #[error("Unknown domain '{0}' (expected 'chw' or 'clinical')")]
    UnknownDomain(String),
}

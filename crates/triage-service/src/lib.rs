//! Triage core service.
//!
//! Provides:
//! - `TriageCore`: one instance per process, built at startup from `Settings`
//! - Guideline retrieval per knowledge domain and hybrid retrieval
//! - `with_governance` for callers' own expensive calls (generation, etc.)
//! - Cache and rate-limit stats for health/admin surfaces
//! - Domain reload with atomic swap

pub mod core;
pub mod error;
pub mod status;

pub use crate::core::TriageCore;
pub use error::ServiceError;
pub use status::DomainStatus;

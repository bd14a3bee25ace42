//! # triage-retrieval
//!
//! Symptom-driven guideline retrieval.
//!
//! `GuidelineRetriever` answers a symptom list from one knowledge domain.
//! `HybridRetriever` puts it in front of an optional live-search source and
//! decides per query, through `UsagePolicy`, whether the expensive source is
//! worth calling. Live-search failures never fail a retrieval.

pub mod error;
pub mod guideline;
pub mod hybrid;
pub mod live;
pub mod policy;

pub use error::RetrievalError;
pub use guideline::{build_query, GuidelineRetriever};
pub use hybrid::{HybridResponse, HybridRetriever, HybridStats, SourceCounts};
pub use live::{LiveResult, LiveSearch, SecondaryResults};
pub use policy::UsagePolicy;

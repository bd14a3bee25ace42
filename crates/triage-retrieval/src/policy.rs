//! When to consult the live source.

use std::sync::atomic::{AtomicU64, Ordering};

use triage_types::KnowledgeDomain;

/// Symptom count at which every query is enriched.
pub const COMPLEX_CASE_TERMS: usize = 3;

/// Usage-budget policy for the live source.
///
/// Clinical-mode queries and complex presentations are always enriched.
/// Simple queries are counted and every `round(1 / usage_rate)`-th one is
/// enriched, so the long-run share of simple traffic converges to the rate.
#[derive(Debug)]
pub struct UsagePolicy {
    usage_rate: f64,
    /// `None` when the rate is zero: simple queries are never enriched.
    period: Option<u64>,
    query_count: AtomicU64,
}

impl UsagePolicy {
    pub fn new(usage_rate: f64) -> Self {
        let usage_rate = if usage_rate.is_finite() {
            usage_rate.clamp(0.0, 1.0)
        } else {
            0.0
        };
        let period = (usage_rate > 0.0).then(|| ((1.0 / usage_rate).round() as u64).max(1));
        Self {
            usage_rate,
            period,
            query_count: AtomicU64::new(0),
        }
    }

    pub fn usage_rate(&self) -> f64 {
        self.usage_rate
    }

    /// Simple queries seen so far.
    pub fn query_count(&self) -> u64 {
        self.query_count.load(Ordering::Relaxed)
    }

    /// Decide for one query. Advances the counter for simple queries only.
    pub fn should_enrich(&self, symptom_terms: &[String], mode: KnowledgeDomain) -> bool {
        if mode == KnowledgeDomain::Clinical || symptom_terms.len() >= COMPLEX_CASE_TERMS {
            return true;
        }

        let n = self.query_count.fetch_add(1, Ordering::Relaxed) + 1;
        self.period.is_some_and(|p| n % p == 0)
    }
}

impl Default for UsagePolicy {
    fn default() -> Self {
        Self::new(0.2)
    }
}

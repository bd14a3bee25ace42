//! Hybrid retrieval E2E tests.
//!
//! The live source is consulted according to the usage policy and never
//! takes local guidelines down with it.

use std::sync::atomic::Ordering;
use std::sync::Arc;

use pretty_assertions::assert_eq;

use e2e_tests::{terms, StubLiveSearch, TestHarness};
use triage_retrieval::{HybridStats, LiveSearch, SourceCounts};
use triage_types::KnowledgeDomain;

fn with_live(harness: &TestHarness, live: &Arc<StubLiveSearch>) -> triage_service::TriageCore {
    let live: Arc<dyn LiveSearch> = live.clone();
    harness.core(Some(live))
}

#[tokio::test]
async fn test_simple_chw_queries_enriched_one_in_five() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let live = StubLiveSearch::new();
    let core = with_live(&harness, &live);

    let mut enriched_at = Vec::new();
    for i in 0..10 {
        let response = core
            .retrieve_hybrid(&terms(&["fever"]), KnowledgeDomain::Chw, None)
            .await
            .unwrap();
        assert_eq!(response.local_results[0].record.title(), "Fever");
        if response.enriched {
            enriched_at.push(i);
        }
    }

    assert_eq!(enriched_at, vec![4, 9]);
    assert_eq!(live.enrichments(), 2);
    assert_eq!(
        core.hybrid_stats(),
        HybridStats {
            secondary_enabled: true,
            query_count: 10,
            usage_rate: 0.2,
        }
    );
}

#[tokio::test]
async fn test_complex_presentation_always_enriched() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let live = StubLiveSearch::new();
    let core = with_live(&harness, &live);

    for _ in 0..4 {
        let response = core
            .retrieve_hybrid(
                &terms(&["fever", "cough", "difficult breathing"]),
                KnowledgeDomain::Chw,
                Some(2),
            )
            .await
            .unwrap();
        assert!(response.enriched);
        assert_eq!(
            response.source_counts,
            SourceCounts {
                local_guidelines: 2,
                literature: 3,
                drug_databases: 0,
                clinical_trials: 1,
            }
        );
    }

    assert_eq!(live.enrichments(), 4);
    assert_eq!(live.drug_calls.load(Ordering::SeqCst), 0);
    assert_eq!(core.hybrid_stats().query_count, 0);
}

#[tokio::test]
async fn test_clinical_mode_enriched_with_drug_lookup() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let live = StubLiveSearch::new();
    let core = with_live(&harness, &live);

    let response = core
        .retrieve_hybrid(&terms(&["cough", "chest pain"]), KnowledgeDomain::Clinical, None)
        .await
        .unwrap();

    assert!(response.enriched);
    assert_eq!(response.local_results[0].record.title(), "Pneumonia");
    assert_eq!(response.source_counts.drug_databases, 1);
    assert!(response.merged_context.contains("Paracetamol dosing (formulary)"));
    assert!(response.merged_context.contains("Review: chest pain (pubmed)"));
}

#[tokio::test]
async fn test_live_failure_keeps_local_results() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let live = StubLiveSearch::new();
    live.set_failing(true);
    let core = with_live(&harness, &live);

    let response = core
        .retrieve_hybrid(&terms(&["fever", "chills"]), KnowledgeDomain::Clinical, None)
        .await
        .unwrap();

    assert!(!response.enriched);
    assert_eq!(response.local_results[0].record.title(), "Malaria");
    assert!(response.secondary_results.is_empty());
    assert!(response.merged_context.is_empty());
    assert_eq!(
        response.source_counts,
        SourceCounts {
            local_guidelines: 3,
            ..Default::default()
        }
    );
    assert_eq!(live.enrichments(), 1);
}

#[tokio::test]
async fn test_no_live_source_is_local_only() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let core = harness.core(None);

    let response = core
        .retrieve_hybrid(
            &terms(&["fever", "cough", "diarrhoea"]),
            KnowledgeDomain::Clinical,
            None,
        )
        .await
        .unwrap();

    assert!(!response.enriched);
    assert_eq!(response.local_results.len(), 3);
    assert!(!core.hybrid_stats().secondary_enabled);
}

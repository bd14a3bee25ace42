//! Graceful degradation E2E tests.
//!
//! Missing, misaligned or corrupt knowledge bases must leave the failing
//! domain unavailable (or degraded) while everything else keeps serving.

use pretty_assertions::assert_eq;

use e2e_tests::{chw_records, guideline, terms, TestHarness};
use triage_service::ServiceError;
use triage_types::KnowledgeDomain;
use triage_vector::save_metadata;

#[tokio::test]
async fn test_missing_domain_does_not_block_other() {
    let harness = TestHarness::new();
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;
    let core = harness.core(None);

    let err = core
        .retrieve_guidelines(KnowledgeDomain::Clinical, &terms(&["fever"]), None)
        .await
        .unwrap_err();
    match err {
        ServiceError::Unavailable { domain, reason } => {
            assert_eq!(domain, KnowledgeDomain::Clinical);
            assert!(reason.contains("IO error"), "reason: {}", reason);
        }
        other => panic!("expected Unavailable, got {other}"),
    }

    assert!(core
        .retrieve_hybrid(&terms(&["fever"]), KnowledgeDomain::Clinical, None)
        .await
        .is_err());

    let hits = core
        .retrieve_guidelines(KnowledgeDomain::Chw, &terms(&["fever"]), Some(1))
        .await
        .unwrap();
    assert_eq!(hits[0].record.title(), "Fever");

    let status = core.status();
    assert_eq!(status.len(), 2);
    assert!(status[0].available);
    assert!(!status[1].available);
}

#[tokio::test]
async fn test_misaligned_metadata_served_degraded() {
    let harness = TestHarness::new();
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;

    let mut records = chw_records();
    records.push(guideline("Rash", &["Isolate"], "rash spots itching"));
    save_metadata(&records, &harness.paths(KnowledgeDomain::Chw).metadata_path).unwrap();

    let core = harness.core(None);
    let status = core.domain_status(KnowledgeDomain::Chw).unwrap();
    assert!(status.available);
    assert!(!status.aligned);
    assert_eq!(status.vectors_on_disk, 4);
    assert_eq!(status.records_on_disk, 5);
    assert_eq!(status.records, 4);

    let hits = core
        .retrieve_guidelines(KnowledgeDomain::Chw, &terms(&["rash"]), Some(10))
        .await
        .unwrap();
    assert_eq!(hits.len(), 4);
    assert!(hits.iter().all(|h| h.record.title() != "Rash"));
}

#[tokio::test]
async fn test_misaligned_metadata_strict_unavailable() {
    let mut harness = TestHarness::new();
    harness.settings.retrieval.strict_alignment = true;
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;
    save_metadata(
        &chw_records()[..2],
        &harness.paths(KnowledgeDomain::Chw).metadata_path,
    )
    .unwrap();

    let core = harness.core(None);
    let status = core.domain_status(KnowledgeDomain::Chw).unwrap();
    assert!(!status.available);
    assert_eq!(
        status.error.as_deref(),
        Some("Index holds 4 vectors but metadata holds 2 records")
    );
}

#[tokio::test]
async fn test_reload_picks_up_rebuilt_domain() {
    let harness = TestHarness::new();
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records()[..1])
        .await;
    let core = harness.core(None);
    assert_eq!(core.domain_status(KnowledgeDomain::Chw).unwrap().records, 1);

    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;
    let status = core.reload_domain(KnowledgeDomain::Chw).await.unwrap();
    assert_eq!(status.records, 4);

    let hits = core
        .retrieve_guidelines(
            KnowledgeDomain::Chw,
            &terms(&["diarrhoea", "dehydration"]),
            Some(1),
        )
        .await
        .unwrap();
    assert_eq!(hits[0].record.title(), "Diarrhoea");
}

#[tokio::test]
async fn test_corrupt_reload_keeps_previous_knowledge() {
    let harness = TestHarness::new();
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;
    let core = harness.core(None);

    std::fs::write(&harness.paths(KnowledgeDomain::Chw).index_path, b"garbage").unwrap();
    assert!(core.reload_domain(KnowledgeDomain::Chw).await.is_err());

    let status = core.domain_status(KnowledgeDomain::Chw).unwrap();
    assert!(status.available);
    assert_eq!(status.records, 4);
}

#[tokio::test]
async fn test_embedding_outage_is_an_error_then_recovers() {
    let harness = TestHarness::new();
    harness
        .build_domain(KnowledgeDomain::Chw, &chw_records())
        .await;
    let core = harness.core(None);

    harness.embedder.set_failing(true);
    let err = core
        .retrieve_guidelines(KnowledgeDomain::Chw, &terms(&["fever"]), None)
        .await
        .unwrap_err();
    assert!(matches!(err, ServiceError::Embedding(_)));

    harness.embedder.set_failing(false);
    assert!(core
        .retrieve_guidelines(KnowledgeDomain::Chw, &terms(&["fever"]), None)
        .await
        .is_ok());
}

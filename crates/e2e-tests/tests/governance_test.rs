//! Call governance E2E tests.
//!
//! Exercise the governor through the core: embedding dedup, caller-wrapped
//! generation calls, sliding-window limits and the cache size bound.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;

use e2e_tests::{terms, TestHarness};
use triage_governor::{governable_fn, CallOutcome};
use triage_types::KnowledgeDomain;

#[tokio::test]
async fn test_identical_queries_embed_once() {
    let harness = TestHarness::new();
    harness.build_all().await;
    let core = harness.core(None);
    let before = harness.embed_calls();

    for _ in 0..5 {
        core.retrieve_guidelines(KnowledgeDomain::Chw, &terms(&["fever", "cough"]), None)
            .await
            .unwrap();
    }
    // Same query text against the other domain shares the embedding
    core.retrieve_guidelines(KnowledgeDomain::Clinical, &terms(&["fever", "cough"]), None)
        .await
        .unwrap();

    assert_eq!(harness.embed_calls() - before, 1);
    assert_eq!(core.cache_stats().entries, 1);
    assert_eq!(core.rate_limit_stats(None).requests_last_minute, 1);
}

#[tokio::test]
async fn test_generation_errors_are_retried_not_cached() {
    let harness = TestHarness::new();
    let core = harness.core(None);
    let calls = Arc::new(AtomicUsize::new(0));

    let counter = Arc::clone(&calls);
    let generate = core.with_governance(
        Some(Duration::from_secs(600)),
        Some("doctor-42"),
        governable_fn("clinical_support", move |transcript: String| {
            let n = counter.fetch_add(1, Ordering::SeqCst);
            async move {
                if n == 0 {
                    Err("model overloaded".to_string())
                } else {
                    Ok(format!("Assessment for: {}", transcript))
                }
            }
        }),
    );

    let first = generate.call("chest pain on exertion".to_string()).await;
    assert!(matches!(first, CallOutcome::Failed(ref e) if e == "model overloaded"));

    let second = generate.call("chest pain on exertion".to_string()).await;
    let third = generate.call("chest pain on exertion".to_string()).await;
    assert!(second.is_success() && !second.is_cached());
    assert!(third.is_cached());
    assert_eq!(calls.load(Ordering::SeqCst), 2);

    let stats = core.rate_limit_stats(Some("doctor-42"));
    assert_eq!(stats.requests_last_minute, 2);
    assert_eq!(core.rate_limit_stats(None).requests_last_minute, 0);
}

#[tokio::test(start_paused = true)]
async fn test_sliding_window_per_identifier() {
    let mut harness = TestHarness::new();
    harness.settings.governor.max_requests_per_minute = 3;
    let core = harness.core(None);

    let echo = core.with_governance(
        None,
        Some("X"),
        governable_fn("echo", |n: u32| async move { Ok::<_, String>(n) }),
    );

    for n in 0..3 {
        assert!(echo.call(n).await.is_success());
    }

    match echo.call(3).await {
        CallOutcome::RateLimited(rejected) => {
            assert_eq!(rejected.identifier, "X");
            assert!(rejected.retry_after > Duration::ZERO);
            assert!(rejected.retry_after <= Duration::from_secs(60));
        }
        other => panic!("expected rate limit, got {:?}", other.is_success()),
    }

    // Cached results bypass the limiter even while it is saturated
    assert!(echo.call(1).await.is_cached());

    tokio::time::advance(Duration::from_secs(61)).await;
    assert!(echo.call(4).await.is_success());
    assert_eq!(core.rate_limit_stats(Some("X")).requests_last_minute, 1);
    assert_eq!(core.rate_limit_stats(Some("X")).requests_last_day, 4);
}

#[tokio::test]
async fn test_cache_stays_bounded() {
    let mut harness = TestHarness::new();
    harness.settings.governor.max_requests_per_minute = 5_000;
    harness.settings.governor.max_requests_per_day = 5_000;
    let core = harness.core(None);

    let square = core.with_governance(
        None,
        None,
        governable_fn("square", |n: u64| async move { Ok::<_, String>(n * n) }),
    );
    for n in 0..1_100u64 {
        assert!(square.call(n).await.is_success());
    }

    let stats = core.cache_stats();
    assert!(stats.entries <= stats.max_entries);
    assert_eq!(stats.max_entries, 1_000);
}

#[tokio::test]
async fn test_concurrent_callers_share_one_quota() {
    let mut harness = TestHarness::new();
    harness.settings.governor.max_requests_per_minute = 5;
    let core = harness.core(None);

    let lookup = Arc::new(core.with_governance(
        None,
        Some("ward-3"),
        governable_fn("lookup", |n: u32| async move { Ok::<_, String>(n + 1) }),
    ));

    let mut handles = Vec::new();
    for n in 0..24u32 {
        let lookup = Arc::clone(&lookup);
        handles.push(tokio::spawn(async move { lookup.call(n).await.is_success() }));
    }

    let mut admitted = 0;
    for handle in handles {
        if handle.await.unwrap() {
            admitted += 1;
        }
    }
    assert_eq!(admitted, 5);
}

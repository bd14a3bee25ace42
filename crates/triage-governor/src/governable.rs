//! Wrapping arbitrary expensive functions in governance.
//!
//! Implement `Governable` for a client type, or adapt a closure with
//! `governable_fn`, then wrap it with `CallGovernor::with_governance`.

use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::warn;

use crate::governor::CallGovernor;
use crate::key::CacheKey;
use crate::outcome::CallOutcome;

/// An expensive call that can be cached and rate limited.
#[async_trait]
pub trait Governable: Send + Sync {
    type Args: Serialize + Send + Sync;
    type Output: Serialize + DeserializeOwned + Send;
    type Error: Send;

    /// Function identity, part of every cache key.
    fn name(&self) -> &str;

    /// Cache key for `args`. `None` disables caching for this call.
    ///
    /// The default hashes the name with the canonical JSON of the arguments.
    fn cache_key(&self, args: &Self::Args) -> Option<CacheKey> {
        match CacheKey::for_call(self.name(), args) {
            Ok(key) => Some(key),
            Err(e) => {
                warn!(func = self.name(), error = %e, "Arguments not keyable, call will not be cached");
                None
            }
        }
    }

    async fn call(&self, args: Self::Args) -> Result<Self::Output, Self::Error>;
}

/// A `Governable` wrapped with a governor, TTL and rate-limit identifier.
pub struct Governed<G> {
    governor: Arc<CallGovernor>,
    ttl: Duration,
    identifier: String,
    inner: G,
}

impl<G: Governable> Governed<G> {
    pub(crate) fn new(governor: Arc<CallGovernor>, ttl: Duration, identifier: String, inner: G) -> Self {
        Self {
            governor,
            ttl,
            identifier,
            inner,
        }
    }

    pub async fn call(&self, args: G::Args) -> CallOutcome<G::Output, G::Error> {
        let key = self.inner.cache_key(&args);
        self.governor
            .call(key, self.ttl, &self.identifier, || self.inner.call(args))
            .await
    }

    pub fn inner(&self) -> &G {
        &self.inner
    }

    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn governor(&self) -> &Arc<CallGovernor> {
        &self.governor
    }
}

/// Closure adapter produced by `governable_fn`.
pub struct GovernableFn<A, T, E, F> {
    name: String,
    f: F,
    _marker: PhantomData<fn(A) -> (T, E)>,
}

/// Adapt an async closure into a `Governable` with the given name.
pub fn governable_fn<A, T, E, F, Fut>(name: impl Into<String>, f: F) -> GovernableFn<A, T, E, F>
where
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send,
{
    GovernableFn {
        name: name.into(),
        f,
        _marker: PhantomData,
    }
}

#[async_trait]
impl<A, T, E, F, Fut> Governable for GovernableFn<A, T, E, F>
where
    A: Serialize + Send + Sync + 'static,
    T: Serialize + DeserializeOwned + Send + 'static,
    E: Send + 'static,
    F: Fn(A) -> Fut + Send + Sync,
    Fut: Future<Output = Result<T, E>> + Send + 'static,
{
    type Args = A;
    type Output = T;
    type Error = E;

    fn name(&self) -> &str {
        &self.name
    }

    async fn call(&self, args: A) -> Result<T, E> {
        (self.f)(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use triage_types::GovernorSettings;

    #[derive(Serialize)]
    struct SoapArgs {
        transcript: String,
        language: String,
    }

    #[derive(Debug, Serialize, Deserialize, PartialEq)]
    struct SoapNote {
        subjective: String,
    }

    struct SoapGenerator {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Governable for SoapGenerator {
        type Args = SoapArgs;
        type Output = SoapNote;
        type Error = String;

        fn name(&self) -> &str {
            "generate_soap_note"
        }

        async fn call(&self, args: SoapArgs) -> Result<SoapNote, String> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if args.transcript.is_empty() {
                return Err("empty transcript".to_string());
            }
            Ok(SoapNote {
                subjective: format!("[{}] {}", args.language, args.transcript),
            })
        }
    }

    fn args(transcript: &str) -> SoapArgs {
        SoapArgs {
            transcript: transcript.to_string(),
            language: "en".to_string(),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_governed_trait_object_caches() {
        let governor = Arc::new(CallGovernor::default());
        let soap = governor.with_governance(
            Duration::from_secs(600),
            "scribe",
            SoapGenerator {
                calls: AtomicUsize::new(0),
            },
        );

        let first = soap.call(args("headache for two days")).await;
        let second = soap.call(args("headache for two days")).await;
        assert!(!first.is_cached());
        assert!(second.is_cached());
        assert_eq!(
            second.value(),
            Some(SoapNote {
                subjective: "[en] headache for two days".to_string()
            })
        );
        assert_eq!(soap.inner().calls.load(Ordering::SeqCst), 1);
        assert_eq!(soap.identifier(), "scribe");
    }

    #[tokio::test(start_paused = true)]
    async fn test_governed_error_is_retried() {
        let governor = Arc::new(CallGovernor::default());
        let soap = governor.govern(SoapGenerator {
            calls: AtomicUsize::new(0),
        });

        assert!(matches!(soap.call(args("")).await, CallOutcome::Failed(_)));
        assert!(matches!(soap.call(args("")).await, CallOutcome::Failed(_)));
        assert_eq!(soap.inner().calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_closure_adapter() {
        let governor = Arc::new(CallGovernor::new(&GovernorSettings {
            max_requests_per_minute: 2,
            ..Default::default()
        }));
        let counter = Arc::new(AtomicUsize::new(0));
        let c = Arc::clone(&counter);
        let summarize = governor.with_governance(
            Duration::from_secs(60),
            "handover",
            governable_fn("summarize_handover", move |ward: String| {
                let c = Arc::clone(&c);
                async move {
                    c.fetch_add(1, Ordering::SeqCst);
                    Ok::<_, String>(format!("handover for {ward}"))
                }
            }),
        );

        assert!(summarize.call("ward-a".to_string()).await.is_success());
        assert!(summarize.call("ward-a".to_string()).await.is_cached());
        assert!(summarize.call("ward-b".to_string()).await.is_success());
        assert!(summarize.call("ward-c".to_string()).await.is_rate_limited());
        // cached entries are still served while rate limited
        assert!(summarize.call("ward-b".to_string()).await.is_cached());
        assert_eq!(counter.load(Ordering::SeqCst), 2);
    }
}

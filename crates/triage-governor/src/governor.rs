//! The call governor: cache lookup, rate check, call, cache store.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use triage_types::GovernorSettings;

use crate::cache::{CacheStats, ResponseCache};
use crate::governable::{Governable, Governed};
use crate::key::CacheKey;
use crate::limiter::RateLimiter;
use crate::outcome::CallOutcome;

/// Rate-limit snapshot for one identifier, for health and admin surfaces.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimitStats {
    pub identifier: String,
    pub requests_last_minute: usize,
    pub requests_last_day: usize,
    pub max_per_minute: usize,
    pub max_per_day: usize,
    pub cache_enabled: bool,
    pub cache_size: usize,
    pub cache_ttl_secs: u64,
}

/// Shared cache and rate limiter for every expensive call in the process.
///
/// Construct once at startup and hand out `Arc<CallGovernor>`; all state is
/// internally synchronized.
pub struct CallGovernor {
    cache: ResponseCache,
    limiter: RateLimiter,
    cache_enabled: bool,
    default_ttl: Duration,
    default_identifier: String,
}

impl Default for CallGovernor {
    fn default() -> Self {
        Self::new(&GovernorSettings::default())
    }
}

impl CallGovernor {
    pub fn new(settings: &GovernorSettings) -> Self {
        Self {
            cache: ResponseCache::new(settings.max_cache_entries, settings.eviction_fraction),
            limiter: RateLimiter::new(
                settings.max_requests_per_minute,
                settings.max_requests_per_day,
            ),
            cache_enabled: settings.cache_enabled,
            default_ttl: Duration::from_secs(settings.cache_ttl_secs),
            default_identifier: settings.default_identifier.clone(),
        }
    }

    pub fn default_ttl(&self) -> Duration {
        self.default_ttl
    }

    pub fn default_identifier(&self) -> &str {
        &self.default_identifier
    }

    /// Run `call` under governance.
    ///
    /// `key` of `None` means the arguments could not be keyed; the call still
    /// runs (rate limited as usual) but its result is not cached.
    pub async fn call<T, E, F, Fut>(
        &self,
        key: Option<CacheKey>,
        ttl: Duration,
        identifier: &str,
        call: F,
    ) -> CallOutcome<T, E>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let key = key.filter(|_| self.cache_enabled);

        if let Some(key) = &key {
            if let Some(stored) = self.cache.get(key) {
                match serde_json::from_value::<T>(stored) {
                    Ok(value) => return CallOutcome::Success { value, cached: true },
                    Err(e) => {
                        warn!(key = key.prefix(), error = %e, "Cached value has unexpected shape, ignoring");
                    }
                }
            }
        }

        if let Err(rejected) = self.limiter.check_and_record(identifier) {
            return CallOutcome::RateLimited(rejected);
        }

        match call().await {
            Ok(value) => {
                if let Some(key) = key {
                    match serde_json::to_value(&value) {
                        Ok(json) => self.cache.insert(key, json, ttl),
                        Err(e) => warn!(key = key.prefix(), error = %e, "Result not cacheable"),
                    }
                }
                CallOutcome::Success {
                    value,
                    cached: false,
                }
            }
            Err(e) => {
                debug!(identifier, "Governed call failed, result not cached");
                CallOutcome::Failed(e)
            }
        }
    }

    /// Wrap `inner` so every call goes through this governor.
    pub fn with_governance<G: Governable>(
        self: &Arc<Self>,
        ttl: Duration,
        identifier: impl Into<String>,
        inner: G,
    ) -> Governed<G> {
        Governed::new(Arc::clone(self), ttl, identifier.into(), inner)
    }

    /// Wrap `inner` using the configured TTL and default identifier.
    pub fn govern<G: Governable>(self: &Arc<Self>, inner: G) -> Governed<G> {
        let identifier = self.default_identifier.clone();
        self.with_governance(self.default_ttl, identifier, inner)
    }

    pub fn cache_stats(&self) -> CacheStats {
        CacheStats {
            enabled: self.cache_enabled,
            entries: self.cache.len(),
            max_entries: self.cache.max_entries(),
            ttl_secs: self.default_ttl.as_secs(),
        }
    }

    pub fn rate_limit_stats(&self, identifier: &str) -> RateLimitStats {
        let counts = self.limiter.counts(identifier);
        RateLimitStats {
            identifier: identifier.to_string(),
            requests_last_minute: counts.last_minute,
            requests_last_day: counts.last_day,
            max_per_minute: self.limiter.max_per_minute(),
            max_per_day: self.limiter.max_per_day(),
            cache_enabled: self.cache_enabled,
            cache_size: self.cache.len(),
            cache_ttl_secs: self.default_ttl.as_secs(),
        }
    }

    /// Drop every cached response. Returns the number removed.
    pub fn clear_cache(&self) -> usize {
        let count = self.cache.clear();
        debug!(count, "Cache cleared");
        count
    }

    /// Reset request history for one identifier, or all of them.
    pub fn clear_rate_limits(&self, identifier: Option<&str>) {
        self.limiter.clear(identifier);
        debug!(identifier = identifier.unwrap_or("*"), "Rate limits cleared");
    }
}

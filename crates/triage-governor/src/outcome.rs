//! Tagged results of governed calls.

use std::time::Duration;

use serde::Serialize;

use crate::limiter::LimitWindow;

/// A governed call was refused by the rate limiter.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RateLimited {
    pub identifier: String,
    pub window: LimitWindow,
    pub limit: usize,
    /// How long until a slot frees up in the rejecting window.
    pub retry_after: Duration,
}

impl RateLimited {
    pub fn new(
        identifier: impl Into<String>,
        window: LimitWindow,
        limit: usize,
        retry_after: Duration,
    ) -> Self {
        Self {
            identifier: identifier.into(),
            window,
            limit,
            retry_after,
        }
    }

    pub fn retry_after_secs(&self) -> f64 {
        self.retry_after.as_secs_f64()
    }
}

impl std::fmt::Display for RateLimited {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Rate limit exceeded. Please try again in {:.0} seconds.",
            self.retry_after_secs().ceil()
        )
    }
}

/// Result of a governed call.
///
/// Callers branch on the variant: a rate-limit rejection is not a failure of
/// the wrapped function and must not be reported as one.
#[derive(Debug)]
pub enum CallOutcome<T, E> {
    /// The call produced a value, either fresh or from the cache.
    Success { value: T, cached: bool },
    /// The wrapped function returned an error. Never cached.
    Failed(E),
    /// The limiter refused the call before it was made.
    RateLimited(RateLimited),
}

impl<T, E> CallOutcome<T, E> {
    pub fn is_success(&self) -> bool {
        matches!(self, CallOutcome::Success { .. })
    }

    pub fn is_cached(&self) -> bool {
        matches!(self, CallOutcome::Success { cached: true, .. })
    }

    pub fn is_rate_limited(&self) -> bool {
        matches!(self, CallOutcome::RateLimited(_))
    }

    pub fn value(self) -> Option<T> {
        match self {
            CallOutcome::Success { value, .. } => Some(value),
            _ => None,
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> CallOutcome<U, E> {
        match self {
            CallOutcome::Success { value, cached } => CallOutcome::Success {
                value: f(value),
                cached,
            },
            CallOutcome::Failed(e) => CallOutcome::Failed(e),
            CallOutcome::RateLimited(r) => CallOutcome::RateLimited(r),
        }
    }

    /// Collapse into a `Result`, converting both failure variants with `on_error`.
    pub fn into_result<F>(self, on_error: impl FnOnce(Result<E, RateLimited>) -> F) -> Result<T, F> {
        match self {
            CallOutcome::Success { value, .. } => Ok(value),
            CallOutcome::Failed(e) => Err(on_error(Ok(e))),
            CallOutcome::RateLimited(r) => Err(on_error(Err(r))),
        }
    }
}

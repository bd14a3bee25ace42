//! # triage-governor
//!
//! Call governance for expensive outbound calls (embeddings, generation).
//!
//! Every governed call goes through the same state machine:
//!
//! ```text
//! UNCACHED ──hit──────────────────────────────────────────▶ RETURNED (cached)
//!    │
//!    └─miss─▶ RATE_CHECK ──allowed──▶ CALL ──▶ CACHE_STORE ─▶ RETURNED
//!                 │
//!                 └─rejected─────────────────────────────────▶ RETURNED (rate limited)
//! ```
//!
//! ## Features
//! - Content-addressed response cache with TTL and size-bounded eviction
//! - Per-identifier sliding-window limits (per minute and per day)
//! - Rate limiting surfaces as a tagged `CallOutcome`, never as a panic or error
//! - Errors returned by the wrapped call are never cached

pub mod cache;
pub mod governable;
pub mod governor;
pub mod key;
pub mod limiter;
pub mod outcome;

pub use cache::{CacheStats, ResponseCache};
pub use governable::{governable_fn, Governable, GovernableFn, Governed};
pub use governor::{CallGovernor, RateLimitStats};
pub use key::CacheKey;
pub use limiter::{LimitWindow, RateLimiter, WindowCounts};
pub use outcome::{CallOutcome, RateLimited};

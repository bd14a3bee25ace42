//! Sliding-window rate limiter.
//!
//! Each identifier keeps an ordered history of request instants, pruned to
//! the trailing 24 hours on every check. The per-minute and per-day counts
//! are both derived from that one history.
//!
//! Check-then-record for one identifier runs under that identifier's own
//! mutex, so two concurrent requests can never both take the last slot.
//! The outer map is only touched to find the window, so different
//! identifiers do not serialize behind each other.
//!
//! Identifiers that go quiet are swept once the map grows past a threshold
//! that doubles with the number of live identifiers.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::outcome::RateLimited;

const MINUTE: Duration = Duration::from_secs(60);
const DAY: Duration = Duration::from_secs(86_400);
const SWEEP_MIN: usize = 1024;

/// Which limit rejected a request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum LimitWindow {
    Minute,
    Day,
}

impl LimitWindow {
    pub fn length(&self) -> Duration {
        match self {
            LimitWindow::Minute => MINUTE,
            LimitWindow::Day => DAY,
        }
    }
}

/// Request counts for one identifier.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct WindowCounts {
    pub last_minute: usize,
    pub last_day: usize,
}

#[derive(Default)]
struct RateWindow {
    requests: VecDeque<Instant>,
}

impl RateWindow {
    fn prune(&mut self, now: Instant) {
        while let Some(&oldest) = self.requests.front() {
            if now.saturating_duration_since(oldest) < DAY {
                break;
            }
            self.requests.pop_front();
        }
    }

    /// Oldest request inside the trailing minute, and how many there are.
    fn last_minute(&self, now: Instant) -> (Option<Instant>, usize) {
        let start = self
            .requests
            .partition_point(|&t| now.saturating_duration_since(t) >= MINUTE);
        (self.requests.get(start).copied(), self.requests.len() - start)
    }

    fn counts(&self, now: Instant) -> WindowCounts {
        let last_day = self
            .requests
            .iter()
            .filter(|&&t| now.saturating_duration_since(t) < DAY)
            .count();
        WindowCounts {
            last_minute: self.last_minute(now).1,
            last_day,
        }
    }
}

/// Per-identifier sliding-window limiter.
pub struct RateLimiter {
    windows: DashMap<String, Arc<Mutex<RateWindow>>>,
    max_per_minute: usize,
    max_per_day: usize,
    sweep_at: AtomicUsize,
}

impl RateLimiter {
    pub fn new(max_per_minute: usize, max_per_day: usize) -> Self {
        Self {
            windows: DashMap::new(),
            max_per_minute,
            max_per_day,
            sweep_at: AtomicUsize::new(SWEEP_MIN),
        }
    }

    pub fn max_per_minute(&self) -> usize {
        self.max_per_minute
    }

    pub fn max_per_day(&self) -> usize {
        self.max_per_day
    }

    fn window(&self, identifier: &str) -> Arc<Mutex<RateWindow>> {
        if let Some(window) = self.windows.get(identifier) {
            return Arc::clone(window.value());
        }
        if self.windows.len() >= self.sweep_at.load(Ordering::Relaxed) {
            self.sweep();
        }
        Arc::clone(self.windows.entry(identifier.to_string()).or_default().value())
    }

    /// Drop windows with no request in the trailing day.
    ///
    /// A window cloned out of the map by an in-flight check is kept; the
    /// shard lock held by `retain` stops new clones while it runs.
    fn sweep(&self) {
        let now = Instant::now();
        let before = self.windows.len();
        self.windows.retain(|_, window| {
            if Arc::strong_count(window) > 1 {
                return true;
            }
            let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
            window.prune(now);
            !window.requests.is_empty()
        });
        let live = self.windows.len();
        self.sweep_at
            .store(live.saturating_mul(2).max(SWEEP_MIN), Ordering::Relaxed);
        debug!(removed = before.saturating_sub(live), live, "Idle rate windows swept");
    }

    /// Number of identifiers currently tracked.
    pub fn tracked(&self) -> usize {
        self.windows.len()
    }

    /// Admit one request for `identifier`, recording it, or reject it with a retry hint.
    pub fn check_and_record(&self, identifier: &str) -> Result<(), RateLimited> {
        let window = self.window(identifier);
        let mut window = window.lock().unwrap_or_else(PoisonError::into_inner);
        let now = Instant::now();

        window.prune(now);

        let (oldest_recent, recent) = window.last_minute(now);
        if recent >= self.max_per_minute {
            let elapsed = oldest_recent.map_or(Duration::ZERO, |t| now.saturating_duration_since(t));
            let rejection = RateLimited::new(
                identifier,
                LimitWindow::Minute,
                self.max_per_minute,
                MINUTE.saturating_sub(elapsed),
            );
            warn!(identifier, retry_after_secs = rejection.retry_after_secs(), "Per-minute rate limit exceeded");
            return Err(rejection);
        }

        if window.requests.len() >= self.max_per_day {
            let elapsed = window
                .requests
                .front()
                .map_or(Duration::ZERO, |&t| now.saturating_duration_since(t));
            let rejection = RateLimited::new(
                identifier,
                LimitWindow::Day,
                self.max_per_day,
                DAY.saturating_sub(elapsed),
            );
            warn!(identifier, retry_after_secs = rejection.retry_after_secs(), "Daily rate limit exceeded");
            return Err(rejection);
        }

        window.requests.push_back(now);
        debug!(identifier, last_minute = recent + 1, "Request admitted");
        Ok(())
    }

    /// Current counts for `identifier`. Read-only: nothing is pruned or created.
    pub fn counts(&self, identifier: &str) -> WindowCounts {
        let Some(window) = self.windows.get(identifier).map(|w| Arc::clone(w.value())) else {
            return WindowCounts::default();
        };
        let window = window.lock().unwrap_or_else(PoisonError::into_inner);
        window.counts(Instant::now())
    }

    /// Forget history for one identifier, or for all of them.
    pub fn clear(&self, identifier: Option<&str>) {
        match identifier {
            Some(id) => {
                self.windows.remove(id);
            }
            None => self.windows.clear(),
        }
    }
}

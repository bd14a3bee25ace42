//! TTL response cache.
//!
//! Values are stored as JSON so one cache can serve calls with different
//! return types. Expired entries are dropped lazily on read; when the cache
//! grows past its ceiling the entries closest to expiry are evicted first.

use std::time::Duration;

use dashmap::DashMap;
use serde::Serialize;
use tokio::time::Instant;
use tracing::debug;

use crate::key::CacheKey;

struct CacheEntry {
    value: serde_json::Value,
    expires_at: Instant,
}

/// Snapshot of cache occupancy.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStats {
    pub enabled: bool,
    pub entries: usize,
    pub max_entries: usize,
    pub ttl_secs: u64,
}

/// Concurrent TTL cache keyed by `CacheKey`.
pub struct ResponseCache {
    entries: DashMap<CacheKey, CacheEntry>,
    max_entries: usize,
    eviction_fraction: f64,
}

impl ResponseCache {
    pub fn new(max_entries: usize, eviction_fraction: f64) -> Self {
        Self {
            entries: DashMap::new(),
            max_entries: max_entries.max(1),
            eviction_fraction,
        }
    }

    /// Get a live value, dropping the entry if it has expired.
    pub fn get(&self, key: &CacheKey) -> Option<serde_json::Value> {
        let now = Instant::now();
        {
            let Some(entry) = self.entries.get(key) else {
                debug!(key = key.prefix(), "Cache miss");
                return None;
            };
            if entry.expires_at > now {
                debug!(key = key.prefix(), "Cache hit");
                return Some(entry.value.clone());
            }
        }
        // Re-check under the write lock: a concurrent insert may have refreshed it.
        if self
            .entries
            .remove_if(key, |_, entry| entry.expires_at <= now)
            .is_some()
        {
            debug!(key = key.prefix(), "Cache miss (expired)");
        }
        None
    }

    /// Store a value for `ttl`, evicting if the ceiling is exceeded.
    pub fn insert(&self, key: CacheKey, value: serde_json::Value, ttl: Duration) {
        let expires_at = Instant::now() + ttl;
        debug!(key = key.prefix(), ttl_secs = ttl.as_secs(), "Cache set");
        self.entries.insert(key, CacheEntry { value, expires_at });

        if self.entries.len() > self.max_entries {
            self.evict();
        }
    }

    /// Drop the share of entries with the soonest expiry.
    fn evict(&self) {
        let mut by_expiry: Vec<(CacheKey, Instant)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().expires_at))
            .collect();
        let len = by_expiry.len();
        if len <= self.max_entries {
            return;
        }

        let count = ((len as f64 * self.eviction_fraction).ceil() as usize)
            .max(len - self.max_entries)
            .min(len);
        by_expiry.sort_by_key(|(_, expires_at)| *expires_at);

        for (key, _) in by_expiry.into_iter().take(count) {
            self.entries.remove(&key);
        }
        debug!(evicted = count, remaining = self.entries.len(), "Cache eviction");
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn max_entries(&self) -> usize {
        self.max_entries
    }

    /// Remove every entry, returning how many were dropped.
    pub fn clear(&self) -> usize {
        let count = self.entries.len();
        self.entries.clear();
        count
    }
}

//! In-memory response caching.
//!
//! # Design Decisions
//! - Keyed by the canonical inbound identity (`METHOD path?query`)
//! - Values carry the full response the client saw: status, normalized
//!   content type, body bytes — a hit is byte-identical to the original
//!   except for the cache-status marker and freshly computed rate-limit
//!   headers, which the assembler adds per request
//! - Writes are fire-and-forget relative to the response path; failures
//!   are logged, never surfaced
//! - Expired entries are dropped on lookup and swept opportunistically
//!   on a sampled fraction of writes

use std::time::{Duration, SystemTime};

use axum::body::Bytes;
use axum::http::{Method, StatusCode, Uri};
use dashmap::DashMap;

/// Sampling denominator for the opportunistic expiry sweep on writes.
const SWEEP_SAMPLE: usize = 64;

/// A stored upstream response.
#[derive(Debug, Clone)]
pub struct CachedResponse {
    pub status: StatusCode,
    pub content_type: String,
    pub body: Bytes,
    expires_at: SystemTime,
}

impl CachedResponse {
    fn is_fresh(&self, now: SystemTime) -> bool {
        now < self.expires_at
    }
}

/// Canonical cache key for an inbound request.
pub fn request_key(method: &Method, uri: &Uri) -> String {
    let path_and_query = uri
        .path_and_query()
        .map(|pq| pq.as_str())
        .unwrap_or_else(|| uri.path());
    format!("{} {}", method, path_and_query)
}

/// TTL cache for full HTTP responses.
#[derive(Debug, Default)]
pub struct ResponseCache {
    entries: DashMap<String, CachedResponse>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Look up a still-fresh entry; an expired one is dropped.
    pub fn lookup(&self, key: &str) -> Option<CachedResponse> {
        self.lookup_at(key, SystemTime::now())
    }

    fn lookup_at(&self, key: &str, now: SystemTime) -> Option<CachedResponse> {
        // Clone out of the shard guard before any removal to avoid
        // holding a read lock across the write.
        let hit = self.entries.get(key).map(|entry| entry.value().clone());
        match hit {
            Some(entry) if entry.is_fresh(now) => Some(entry),
            Some(_) => {
                self.entries.remove(key);
                None
            }
            None => None,
        }
    }

    /// Store a response under `key` for `ttl`.
    pub fn store(&self, key: String, status: StatusCode, content_type: String, body: Bytes, ttl: Duration) {
        self.store_at(key, status, content_type, body, ttl, SystemTime::now());
    }

    fn store_at(
        &self,
        key: String,
        status: StatusCode,
        content_type: String,
        body: Bytes,
        ttl: Duration,
        now: SystemTime,
    ) {
        if fastrand::usize(..SWEEP_SAMPLE) == 0 {
            self.sweep_expired(now);
        }

        self.entries.insert(
            key,
            CachedResponse {
                status,
                content_type,
                body,
                expires_at: now + ttl,
            },
        );
    }

    fn sweep_expired(&self, now: SystemTime) {
        self.entries.retain(|_, entry| entry.is_fresh(now));
    }

    /// Number of stored entries (for tests and diagnostics).
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True when nothing is cached.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

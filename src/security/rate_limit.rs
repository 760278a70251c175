//! Fixed-window rate limiting.
//!
//! # Design Decisions
//! - One counter per identifier (client IP or app name), created lazily
//! - Window does not slide; a burst at the boundary can admit up to
//!   twice the quota, an accepted approximation of abuse mitigation
//! - Counters are instance-local and non-durable; per-key
//!   insert-or-update goes through `DashMap` so thread-level
//!   parallelism needs no extra locking
//! - The deny path never increments, so a counter never passes the
//!   limit
//! - Stale entries are evicted opportunistically on a sampled fraction
//!   of checks; only entries whose window already expired are removed

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use dashmap::DashMap;

/// Sampling denominator for opportunistic eviction: roughly one check
/// in this many sweeps the map for expired windows.
const EVICTION_SAMPLE: usize = 64;

/// Outcome of a rate-limit check, with everything the response headers
/// need.
#[derive(Debug, Clone, Copy)]
pub struct RateLimitDecision {
    pub allowed: bool,
    pub limit: u32,
    pub remaining: u32,
    pub reset_at: SystemTime,
}

impl RateLimitDecision {
    /// Window end as unix seconds, for `X-RateLimit-Reset`.
    pub fn reset_epoch_secs(&self) -> u64 {
        self.reset_at
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_secs()
    }

    /// Whole seconds until the window ends, for `Retry-After`.
    /// Never reports zero for a denied request.
    pub fn retry_after_secs(&self) -> u64 {
        let remaining = self
            .reset_at
            .duration_since(SystemTime::now())
            .unwrap_or_default();
        remaining.as_secs().max(1)
    }
}

#[derive(Debug)]
struct WindowEntry {
    count: u32,
    reset_at: SystemTime,
}

/// Per-identifier fixed-window counter store.
///
/// Owned by the server instance and injected into the pipeline, so
/// multiple gateways can coexist in one process and tests stay
/// isolated.
#[derive(Debug)]
pub struct RateLimiter {
    entries: DashMap<String, WindowEntry>,
    max_requests: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(max_requests: u32, window: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            max_requests,
            window,
        }
    }

    /// Check and account one request for `identifier`.
    pub fn check(&self, identifier: &str) -> RateLimitDecision {
        self.check_at(identifier, SystemTime::now())
    }

    fn check_at(&self, identifier: &str, now: SystemTime) -> RateLimitDecision {
        if fastrand::usize(..EVICTION_SAMPLE) == 0 {
            self.evict_expired(now);
        }

        let mut entry = self
            .entries
            .entry(identifier.to_owned())
            .or_insert_with(|| WindowEntry {
                count: 0,
                reset_at: now + self.window,
            });

        // Expired window: start a fresh one.
        if now > entry.reset_at {
            entry.count = 0;
            entry.reset_at = now + self.window;
        }

        if entry.count >= self.max_requests {
            return RateLimitDecision {
                allowed: false,
                limit: self.max_requests,
                remaining: 0,
                reset_at: entry.reset_at,
            };
        }

        entry.count += 1;
        RateLimitDecision {
            allowed: true,
            limit: self.max_requests,
            remaining: self.max_requests - entry.count,
            reset_at: entry.reset_at,
        }
    }

    /// Drop entries whose window has already expired. Entries still
    /// relied on to deny a request are never touched.
    fn evict_expired(&self, now: SystemTime) {
        self.entries.retain(|_, entry| now <= entry.reset_at);
    }

    /// Number of tracked identifiers (for tests and diagnostics).
    pub fn tracked(&self) -> usize {
        self.entries.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allows_exactly_the_quota() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        let now = SystemTime::now();

        for i in 0..3 {
            let d = limiter.check_at("1.2.3.4", now);
            assert!(d.allowed, "request {} should pass", i + 1);
            assert_eq!(d.remaining, 2 - i);
        }

        let denied = limiter.check_at("1.2.3.4", now);
        assert!(!denied.allowed);
        assert_eq!(denied.remaining, 0);
    }

    #[test]
    fn deny_path_does_not_extend_the_window() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = SystemTime::now();

        let first = limiter.check_at("k", now);
        let denied = limiter.check_at("k", now + Duration::from_secs(5));
        assert!(!denied.allowed);
        assert_eq!(denied.reset_at, first.reset_at);
    }

    #[test]
    fn counter_restarts_after_window() {
        let limiter = RateLimiter::new(2, Duration::from_secs(10));
        let now = SystemTime::now();

        limiter.check_at("k", now);
        limiter.check_at("k", now);
        assert!(!limiter.check_at("k", now).allowed);

        let later = now + Duration::from_secs(11);
        let d = limiter.check_at("k", later);
        assert!(d.allowed);
        assert_eq!(d.remaining, 1);
        assert_eq!(d.reset_at, later + Duration::from_secs(10));
    }

    #[test]
    fn identifiers_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        let now = SystemTime::now();

        assert!(limiter.check_at("a", now).allowed);
        assert!(!limiter.check_at("a", now).allowed);
        assert!(limiter.check_at("b", now).allowed);
    }

    #[test]
    fn eviction_only_removes_expired_entries() {
        let limiter = RateLimiter::new(1, Duration::from_secs(10));
        let now = SystemTime::now();

        limiter.check_at("old", now);
        limiter.check_at("fresh", now + Duration::from_secs(9));
        assert_eq!(limiter.tracked(), 2);

        limiter.evict_expired(now + Duration::from_secs(11));
        assert_eq!(limiter.tracked(), 1);

        // The surviving entry still denies within its window.
        assert!(!limiter
            .check_at("fresh", now + Duration::from_secs(9))
            .allowed);
    }
}

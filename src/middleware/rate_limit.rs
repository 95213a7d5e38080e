//! Per-client sliding-window rate limiting.
//!
//! Each client key owns a queue of the timestamps it was admitted at,
//! oldest first. Admitting a request:
//!
//! 1. pops every timestamp older than the window from the front;
//! 2. rejects if the remaining count has reached the limit, **without**
//!    recording the rejected attempt;
//! 3. otherwise records `now` and admits.
//!
//! A timestamp is expired when `now - ts > window`. One exactly a window old
//! is still counted.
//!
//! Keys live in a [`DashMap`]. The whole evict-compare-append sequence runs
//! while holding the key's entry, i.e. its shard's write lock, so two
//! concurrent requests for the last free slot cannot both get in. Distinct
//! keys in different shards never contend.

use std::collections::VecDeque;
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::json;
use tracing::{debug, warn};

use super::{Middleware, Next};
use crate::handler::Outcome;
use crate::request::Request;
use crate::response::Response;
use crate::status::Status;

/// Admits at most `limit` requests per key in any trailing `window`.
#[derive(Debug)]
pub struct RateLimiter {
    limit: usize,
    window: Duration,
    windows: DashMap<String, VecDeque<Instant>>,
}

impl RateLimiter {
    pub fn new(limit: usize, window: Duration) -> Self {
        Self { limit, window, windows: DashMap::new() }
    }

    /// `limit` requests per 60-second window.
    pub fn per_minute(limit: usize) -> Self {
        Self::new(limit, Duration::from_secs(60))
    }

    pub fn limit(&self) -> usize { self.limit }
    pub fn window(&self) -> Duration { self.window }

    /// Number of client keys currently tracked.
    pub fn len(&self) -> usize { self.windows.len() }

    pub fn is_empty(&self) -> bool { self.windows.is_empty() }

    /// Records and admits a request from `key` at `now`, or rejects it.
    ///
    /// `now` must come from a monotonic clock and be non-decreasing per key.
    pub fn admit(&self, key: &str, now: Instant) -> bool {
        // Known keys are looked up by `&str`; only a new key allocates.
        if let Some(mut stamps) = self.windows.get_mut(key) {
            return self.record(&mut stamps, now);
        }
        // Another thread may have created the key in between; the entry
        // holds the shard lock for the whole check either way.
        let mut stamps = self.windows.entry(key.to_owned()).or_default();
        self.record(&mut stamps, now)
    }

    fn record(&self, stamps: &mut VecDeque<Instant>, now: Instant) -> bool {
        evict(stamps, now, self.window);

        if stamps.len() >= self.limit {
            return false;
        }
        stamps.push_back(now);
        true
    }

    /// Drops every key whose window is empty at `now`. Returns how many were
    /// removed. Keeps the key map from growing without bound on long-lived
    /// processes that see many distinct clients.
    pub fn purge(&self, now: Instant) -> usize {
        let before = self.windows.len();
        self.windows.retain(|_, stamps| {
            evict(stamps, now, self.window);
            !stamps.is_empty()
        });
        let removed = before.saturating_sub(self.windows.len());
        debug!(removed, remaining = self.windows.len(), "purged idle rate-limit windows");
        removed
    }
}

fn evict(stamps: &mut VecDeque<Instant>, now: Instant, window: Duration) {
    while let Some(&oldest) = stamps.front() {
        if now.saturating_duration_since(oldest) > window {
            stamps.pop_front();
        } else {
            break;
        }
    }
}

/// Middleware that answers `429` once a client exceeds its limit.
///
/// The client key is [`Request::client`], the peer address.
#[derive(Clone, Debug)]
pub struct RateLimit {
    limiter: Arc<RateLimiter>,
}

impl RateLimit {
    pub fn new(limiter: Arc<RateLimiter>) -> Self {
        Self { limiter }
    }
}

#[async_trait]
impl Middleware for RateLimit {
    async fn handle(&self, req: Request, next: Next) -> Outcome {
        if !self.limiter.admit(req.client(), Instant::now()) {
            warn!(client = %req.client(), limit = self.limiter.limit(), "rate limit exceeded");
            return Ok(Response::json(json!({
                "error": "rate limit exceeded",
                "limit_per_min": self.limiter.limit(),
            }))
            .with_status(Status::TooManyRequests));
        }
        next.run(req).await
    }
}

#[cfg(test)]
mod tests {
    use std::thread;

    use super::*;

    const MINUTE: Duration = Duration::from_secs(60);

    #[test]
    fn rejects_the_request_after_the_limit() {
        let limiter = RateLimiter::per_minute(3);
        let t0 = Instant::now();

        for i in 0..3 {
            assert!(limiter.admit("10.0.0.1", t0 + Duration::from_secs(i)));
        }
        assert!(!limiter.admit("10.0.0.1", t0 + Duration::from_secs(10)));
    }

    #[test]
    fn capacity_returns_once_the_window_slides() {
        let limiter = RateLimiter::per_minute(2);
        let t0 = Instant::now();

        assert!(limiter.admit("k", t0));
        assert!(limiter.admit("k", t0 + Duration::from_secs(30)));
        assert!(!limiter.admit("k", t0 + Duration::from_secs(59)));

        // t0 has expired; the t0+30 entry has not.
        assert!(limiter.admit("k", t0 + MINUTE + Duration::from_millis(1)));
        assert!(!limiter.admit("k", t0 + MINUTE + Duration::from_millis(2)));
    }

    #[test]
    fn a_timestamp_exactly_one_window_old_still_counts() {
        let limiter = RateLimiter::per_minute(1);
        let t0 = Instant::now();

        assert!(limiter.admit("k", t0));
        assert!(!limiter.admit("k", t0 + MINUTE));
        assert!(limiter.admit("k", t0 + MINUTE + Duration::from_nanos(1)));
    }

    #[test]
    fn rejected_attempts_are_not_recorded() {
        let limiter = RateLimiter::per_minute(1);
        let t0 = Instant::now();

        assert!(limiter.admit("k", t0));
        for s in 1..50 {
            assert!(!limiter.admit("k", t0 + Duration::from_secs(s)));
        }
        // Only t0 was ever recorded, so one slot opens right after it expires.
        assert!(limiter.admit("k", t0 + MINUTE + Duration::from_secs(1)));
    }

    #[test]
    fn keys_are_counted_independently() {
        let limiter = RateLimiter::per_minute(1);
        let t0 = Instant::now();

        assert!(limiter.admit("alice", t0));
        assert!(!limiter.admit("alice", t0));
        assert!(limiter.admit("bob", t0));
        assert_eq!(limiter.len(), 2);
    }

    #[test]
    fn concurrent_requests_never_exceed_the_limit() {
        let limiter = Arc::new(RateLimiter::per_minute(25));
        let now = Instant::now();

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..20).filter(|_| limiter.admit("shared", now)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 25);
    }

    #[test]
    fn new_and_known_keys_share_one_window() {
        let limiter = Arc::new(RateLimiter::per_minute(10));
        let now = Instant::now();

        // Every thread races to create the same fresh key, then keeps hitting it.
        let handles: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                thread::spawn(move || (0..5).filter(|_| limiter.admit("fresh", now)).count())
            })
            .collect();

        let admitted: usize = handles.into_iter().map(|h| h.join().unwrap()).sum();
        assert_eq!(admitted, 10);
        assert_eq!(limiter.len(), 1);
        assert!(!limiter.admit("fresh", now));
    }

    #[test]
    fn purge_drops_idle_keys_only() {
        let limiter = RateLimiter::per_minute(5);
        let t0 = Instant::now();

        limiter.admit("old", t0);
        limiter.admit("fresh", t0 + Duration::from_secs(50));

        assert_eq!(limiter.purge(t0 + Duration::from_secs(61)), 1);
        assert_eq!(limiter.len(), 1);
        assert!(limiter.admit("fresh", t0 + Duration::from_secs(62)));
    }
}

//! Fixed-window request counting per client.

use std::time::Duration;

use dashmap::DashMap;
use tokio::time::Instant;

/// Outcome of [`RateLimiter::admit`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    Allowed,
    /// Ceiling reached; the client may retry after the given duration.
    Denied { retry_after: Duration },
}

/// Counter state for one client key.
#[derive(Debug, Clone, Copy)]
struct RateWindowCounter {
    count: u32,
    window_start: Instant,
}

/// Per-client fixed-window rate limiter.
///
/// Each client key owns a counter that resets when a request arrives at or after
/// `window_start + window`. Rejected attempts are counted too, so a client that keeps
/// retrying does not get a fresh budget before its window ends.
///
/// The counter table is a [`DashMap`]: the read-modify-write of a key happens while
/// holding that key's shard lock, so concurrent admits for the same client serialize.
///
/// Uses [`tokio::time::Instant`] so tests can drive the clock with `tokio::time::pause`.
#[derive(Debug)]
pub struct RateLimiter {
    counters: DashMap<String, RateWindowCounter>,
    ceiling: u32,
    window: Duration,
}

impl RateLimiter {
    pub fn new(ceiling: u32, window: Duration) -> Self {
        Self {
            counters: DashMap::new(),
            ceiling,
            window,
        }
    }

    pub fn ceiling(&self) -> u32 {
        self.ceiling
    }

    pub fn window(&self) -> Duration {
        self.window
    }

    /// Counts one request for `client` at the current time.
    pub fn admit(&self, client: &str) -> Admission {
        self.admit_at(client, Instant::now())
    }

    /// Counts one request for `client` as if it arrived at `now`.
    pub fn admit_at(&self, client: &str, now: Instant) -> Admission {
        let mut counter = self
            .counters
            .entry(client.to_string())
            .or_insert(RateWindowCounter {
                count: 0,
                window_start: now,
            });

        if now.saturating_duration_since(counter.window_start) >= self.window {
            counter.count = 0;
            counter.window_start = now;
        }

        counter.count = counter.count.saturating_add(1);

        if counter.count <= self.ceiling {
            Admission::Allowed
        } else {
            let window_end = counter.window_start + self.window;
            Admission::Denied {
                retry_after: window_end.saturating_duration_since(now),
            }
        }
    }

    /// Requests counted for `client` in its current window.
    pub fn count(&self, client: &str) -> u32 {
        self.counters.get(client).map(|c| c.count).unwrap_or(0)
    }

    /// Number of clients currently tracked.
    pub fn len(&self) -> usize {
        self.counters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counters.is_empty()
    }

    /// Drops counters whose window ended before `now`. Returns how many were removed.
    pub fn evict_idle(&self, now: Instant) -> usize {
        let before = self.counters.len();
        self.counters
            .retain(|_, counter| now.saturating_duration_since(counter.window_start) < self.window);
        before.saturating_sub(self.counters.len())
    }
}

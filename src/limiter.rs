// SPDX-FileCopyrightText: 2026 markdown-cms contributors
// SPDX-License-Identifier: Apache-2.0

//! Sliding-window rate limiter keyed by client identity.
//!
//! Each key holds a count and a window start; a call past the window resets
//! the count before incrementing. The whole check-and-update happens under a
//! single write lock, so concurrent requests for the same key never lose
//! increments. Stale keys are evicted lazily by `cleanup`, which the binary
//! runs on a timer so the map cannot grow without bound.

use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use crate::config::SecurityConfig;

#[derive(Debug)]
struct WindowState {
    count: u32,
    window_start: Instant,
}

/// Sliding-window request throttle.
pub struct RateLimiter {
    max_attempts: u32,
    window: Duration,
    entries: RwLock<HashMap<String, WindowState>>,
}

impl RateLimiter {
    pub fn new(max_attempts: u32, window: Duration) -> Self {
        Self {
            max_attempts,
            window,
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Strict policy for login attempts (default 5 per 15 minutes).
    pub fn for_login(config: &SecurityConfig) -> Self {
        Self::new(config.login_max_attempts, config.login_window())
    }

    /// Looser policy for general API traffic (default 60 per minute).
    pub fn for_api(config: &SecurityConfig) -> Self {
        Self::new(config.api_max_attempts, config.api_window())
    }

    /// Record an attempt for `key` and report whether it exceeds the budget.
    pub async fn is_limited(&self, key: &str) -> bool {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let state = entries.entry(key.to_string()).or_insert(WindowState {
            count: 0,
            window_start: now,
        });

        if now.duration_since(state.window_start) > self.window {
            state.count = 0;
            state.window_start = now;
        }
        state.count += 1;

        let limited = state.count > self.max_attempts;
        if limited {
            warn!(key, count = state.count, "rate limit exceeded");
        }
        limited
    }

    /// Drop entries whose window has fully elapsed.
    pub async fn cleanup(&self) {
        let now = Instant::now();
        let mut entries = self.entries.write().await;
        let before = entries.len();
        entries.retain(|_, state| now.duration_since(state.window_start) <= self.window);
        let evicted = before - entries.len();
        if evicted > 0 {
            debug!(evicted, "evicted stale rate limit entries");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn sixth_attempt_within_window_is_limited() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));
        for i in 0..5 {
            assert!(!limiter.is_limited("1.2.3.4").await, "attempt {} limited", i + 1);
        }
        assert!(limiter.is_limited("1.2.3.4").await);
    }

    #[tokio::test]
    async fn window_expiry_resets_the_count() {
        let limiter = RateLimiter::new(5, Duration::from_millis(40));
        for _ in 0..6 {
            let _ = limiter.is_limited("key").await;
        }
        assert!(limiter.is_limited("key").await);

        tokio::time::sleep(Duration::from_millis(60)).await;
        assert!(!limiter.is_limited("key").await);
    }

    #[tokio::test]
    async fn keys_are_independent() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(!limiter.is_limited("a").await);
        assert!(limiter.is_limited("a").await);
        assert!(!limiter.is_limited("b").await);
    }

    #[tokio::test]
    async fn cleanup_evicts_only_expired_windows() {
        let limiter = RateLimiter::new(5, Duration::from_millis(40));
        let _ = limiter.is_limited("stale").await;
        tokio::time::sleep(Duration::from_millis(60)).await;
        let _ = limiter.is_limited("fresh").await;

        limiter.cleanup().await;
        let entries = limiter.entries.read().await;
        assert!(!entries.contains_key("stale"));
        assert!(entries.contains_key("fresh"));
    }

    #[tokio::test]
    async fn concurrent_attempts_do_not_lose_updates() {
        let limiter = std::sync::Arc::new(RateLimiter::new(100, Duration::from_secs(60)));
        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.is_limited("same").await }));
        }
        for handle in handles {
            handle.await.unwrap();
        }
        let entries = limiter.entries.read().await;
        assert_eq!(entries.get("same").unwrap().count, 50);
    }
}

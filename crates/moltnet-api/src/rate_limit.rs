//! Per-IP sliding-window rate limiting (spec §7 `RateLimited`).
//!
//! A simplified, in-memory cousin of the reference workspace's
//! `RateLimiter`: MoltNet has no login flow to protect with progressive
//! lockout, so only the sliding-window bucket survives the trip over.
//! Distributed deployments would back this with Redis the way the
//! reference does; a single process is the only target here.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub struct RateLimiter {
    limit: u32,
    window: Duration,
    buckets: Arc<RwLock<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new(limit: u32, window: Duration) -> Self {
        Self {
            limit,
            window,
            buckets: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// `Ok(())` if `key` is still under the window limit (and records this
    /// request); `Err(retry_after)` otherwise.
    pub async fn check(&self, key: &str) -> Result<(), Duration> {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();
        let bucket = buckets.entry(key.to_string()).or_default();
        bucket.retain(|&t| now.duration_since(t) < self.window);

        if bucket.len() >= self.limit as usize {
            let oldest = bucket.first().copied().unwrap_or(now);
            let retry_after = self.window.saturating_sub(now.duration_since(oldest));
            return Err(retry_after);
        }

        bucket.push(now);
        Ok(())
    }

    /// Drop buckets that haven't seen a request in twice the window, so
    /// long-lived processes don't accumulate an unbounded key set.
    pub async fn cleanup(&self) {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();
        buckets.retain(|_, bucket| {
            bucket.retain(|&t| now.duration_since(t) < self.window * 2);
            !bucket.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_requests_under_the_limit() {
        let limiter = RateLimiter::new(3, Duration::from_secs(60));
        for _ in 0..3 {
            assert!(limiter.check("1.2.3.4").await.is_ok());
        }
    }

    #[tokio::test]
    async fn rejects_the_request_that_exceeds_the_limit() {
        let limiter = RateLimiter::new(2, Duration::from_secs(60));
        assert!(limiter.check("1.2.3.4").await.is_ok());
        assert!(limiter.check("1.2.3.4").await.is_ok());
        assert!(limiter.check("1.2.3.4").await.is_err());
    }

    #[tokio::test]
    async fn tracks_separate_keys_independently() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check("a").await.is_ok());
        assert!(limiter.check("b").await.is_ok());
        assert!(limiter.check("a").await.is_err());
    }
}

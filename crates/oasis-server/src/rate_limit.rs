//! Per-IP rate limiting using a token bucket

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Buckets idle this long are dropped by [`RateLimiter::cleanup`]
const IDLE_BUCKET_TTL: Duration = Duration::from_secs(300);

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: f64,
    max_tokens: f64,
    /// Tokens added per second
    refill_rate: f64,
    last_update: Instant,
}

impl TokenBucket {
    fn full(config: &RateLimitConfig, now: Instant) -> Self {
        Self {
            tokens: config.requests as f64,
            max_tokens: config.requests as f64,
            refill_rate: config.refill_rate(),
            last_update: now,
        }
    }

    fn try_consume(&mut self, now: Instant) -> bool {
        let elapsed = now.saturating_duration_since(self.last_update).as_secs_f64();
        self.last_update = self.last_update.max(now);
        self.tokens = (self.tokens + elapsed * self.refill_rate).min(self.max_tokens);

        if self.tokens >= 1.0 {
            self.tokens -= 1.0;
            true
        } else {
            false
        }
    }

    /// Time until one whole token is available again
    fn wait_for_token(&self) -> Duration {
        let missing = (1.0 - self.tokens).max(0.0);
        Duration::from_secs_f64(missing / self.refill_rate)
    }
}

/// `requests` per `per_secs` seconds, with bursts up to `requests`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
pub struct RateLimitConfig {
    pub requests: u32,
    pub per_secs: u32,
}

impl RateLimitConfig {
    fn refill_rate(&self) -> f64 {
        self.requests as f64 / self.per_secs as f64
    }
}

/// Shared limiter; clones see the same buckets
#[derive(Clone)]
pub struct RateLimiter {
    buckets: Arc<RwLock<HashMap<IpAddr, TokenBucket>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            buckets: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub fn config(&self) -> RateLimitConfig {
        self.config
    }

    /// Spend one token for `ip`
    pub async fn check(&self, ip: IpAddr) -> RateLimitResult {
        self.check_at(ip, Instant::now()).await
    }

    pub async fn check_at(&self, ip: IpAddr, now: Instant) -> RateLimitResult {
        let mut buckets = self.buckets.write().await;
        let bucket = buckets
            .entry(ip)
            .or_insert_with(|| TokenBucket::full(&self.config, now));

        if bucket.try_consume(now) {
            RateLimitResult::Allowed {
                remaining: bucket.tokens as u32,
                limit: self.config.requests,
            }
        } else {
            RateLimitResult::Limited {
                retry_after: bucket.wait_for_token(),
                limit: self.config.requests,
            }
        }
    }

    /// Drop buckets idle for five minutes; returns how many were removed
    pub async fn cleanup(&self) -> usize {
        self.cleanup_at(Instant::now()).await
    }

    pub async fn cleanup_at(&self, now: Instant) -> usize {
        let mut buckets = self.buckets.write().await;
        let before = buckets.len();
        buckets.retain(|_, b| now.saturating_duration_since(b.last_update) < IDLE_BUCKET_TTL);
        before - buckets.len()
    }

    pub async fn tracked_ips(&self) -> usize {
        self.buckets.read().await.len()
    }
}

/// Result of a rate limit check
#[derive(Debug, Clone, PartialEq)]
pub enum RateLimitResult {
    Allowed { remaining: u32, limit: u32 },
    Limited { retry_after: Duration, limit: u32 },
}

impl RateLimitResult {
    pub fn is_allowed(&self) -> bool {
        matches!(self, RateLimitResult::Allowed { .. })
    }

    /// Whole seconds for a `Retry-After` header, at least 1
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            RateLimitResult::Allowed { .. } => None,
            RateLimitResult::Limited { retry_after, .. } => {
                Some((retry_after.as_secs_f64().ceil() as u64).max(1))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    fn ip(last: u8) -> IpAddr {
        IpAddr::V4(Ipv4Addr::new(127, 0, 0, last))
    }

    fn limiter(requests: u32, per_secs: u32) -> RateLimiter {
        RateLimiter::new(RateLimitConfig { requests, per_secs })
    }

    #[tokio::test]
    async fn test_burst_then_limited() {
        let limiter = limiter(3, 1);
        let now = Instant::now();

        for expected in [2, 1, 0] {
            assert_eq!(
                limiter.check_at(ip(1), now).await,
                RateLimitResult::Allowed {
                    remaining: expected,
                    limit: 3
                }
            );
        }
        let limited = limiter.check_at(ip(1), now).await;
        assert!(!limited.is_allowed());
        assert_eq!(limited.retry_after_secs(), Some(1));
    }

    #[tokio::test]
    async fn test_tokens_refill_over_time() {
        // one request every 10 seconds
        let limiter = limiter(1, 10);
        let start = Instant::now();

        assert!(limiter.check_at(ip(1), start).await.is_allowed());
        let limited = limiter.check_at(ip(1), start + Duration::from_secs(4)).await;
        assert_eq!(limited.retry_after_secs(), Some(6));
        assert!(limiter
            .check_at(ip(1), start + Duration::from_secs(11))
            .await
            .is_allowed());
    }

    #[tokio::test]
    async fn test_different_ips_have_separate_limits() {
        let limiter = limiter(1, 1);
        let now = Instant::now();

        assert!(limiter.check_at(ip(1), now).await.is_allowed());
        assert!(limiter.check_at(ip(2), now).await.is_allowed());
        assert!(!limiter.check_at(ip(1), now).await.is_allowed());
        assert!(!limiter.check_at(ip(2), now).await.is_allowed());
        assert_eq!(limiter.tracked_ips().await, 2);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_buckets() {
        let limiter = limiter(5, 1);
        let start = Instant::now();

        limiter.check_at(ip(1), start).await;
        limiter.check_at(ip(2), start + Duration::from_secs(200)).await;

        assert_eq!(limiter.cleanup_at(start + Duration::from_secs(301)).await, 1);
        assert_eq!(limiter.tracked_ips().await, 1);
    }
}

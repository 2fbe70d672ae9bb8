//! Rate limiting implementation using token bucket algorithm.

use std::collections::HashMap;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Token bucket rate limiter for controlling request rates per key
#[derive(Debug)]
pub struct RateLimiter<K> {
    buckets: RwLock<HashMap<K, TokenBucket>>,
    max_tokens: u32,
    /// Time to earn back one token
    refill_interval: Duration,
    blocked_count: AtomicU64,
}

#[derive(Debug, Clone)]
struct TokenBucket {
    tokens: u32,
    last_refill: Instant,
}

impl<K: Eq + Hash> RateLimiter<K> {
    /// Creates a new rate limiter holding at most `max_tokens`, earning one
    /// token back every `refill_interval`
    pub fn new(max_tokens: u32, refill_interval: Duration) -> Self {
        Self {
            buckets: RwLock::new(HashMap::new()),
            max_tokens,
            refill_interval: refill_interval.max(Duration::from_millis(1)),
            blocked_count: AtomicU64::new(0),
        }
    }

    /// Checks if a request for the given key should be allowed
    pub async fn check_rate_limit(&self, key: K) -> bool {
        let mut buckets = self.buckets.write().await;
        let now = Instant::now();

        let bucket = buckets.entry(key).or_insert(TokenBucket {
            tokens: self.max_tokens,
            last_refill: now,
        });

        // Refill whole tokens and carry the remainder forward
        let elapsed = now.duration_since(bucket.last_refill);
        let earned = elapsed.as_nanos() / self.refill_interval.as_nanos();
        if earned > 0 {
            let earned = u32::try_from(earned).unwrap_or(u32::MAX);
            bucket.tokens = bucket.tokens.saturating_add(earned).min(self.max_tokens);
            bucket.last_refill = if bucket.tokens == self.max_tokens {
                now
            } else {
                bucket.last_refill + self.refill_interval * earned
            };
        }

        if bucket.tokens > 0 {
            bucket.tokens -= 1;
            true
        } else {
            self.blocked_count.fetch_add(1, Ordering::Relaxed);
            false
        }
    }

    /// Forgets the bucket for `key`
    pub async fn remove(&self, key: &K) {
        self.buckets.write().await.remove(key);
    }

    /// Gets the total number of blocked requests
    pub async fn get_blocked_count(&self) -> u64 {
        self.blocked_count.load(Ordering::Relaxed)
    }

    pub async fn tracked_keys(&self) -> usize {
        self.buckets.read().await.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_rate_limiter_allows_within_limit() {
        let limiter = RateLimiter::new(5, Duration::from_secs(60));

        // Should allow first 5 requests
        for _ in 0..5 {
            assert!(limiter.check_rate_limit(7usize).await);
        }

        // Should block the 6th request
        assert!(!limiter.check_rate_limit(7usize).await);
        assert_eq!(limiter.get_blocked_count().await, 1);
    }

    #[tokio::test]
    async fn test_rate_limiter_refill() {
        let limiter = RateLimiter::new(2, Duration::from_millis(100));

        // Use up tokens
        assert!(limiter.check_rate_limit("a").await);
        assert!(limiter.check_rate_limit("a").await);
        assert!(!limiter.check_rate_limit("a").await);

        // Wait for refill (extra time for test reliability)
        tokio::time::sleep(Duration::from_millis(500)).await;

        // Should be able to make requests again
        assert!(limiter.check_rate_limit("a").await);
        assert!(limiter.check_rate_limit("a").await);
    }

    #[tokio::test]
    async fn test_remove_resets_bucket() {
        let limiter = RateLimiter::new(1, Duration::from_secs(60));
        assert!(limiter.check_rate_limit(1u32).await);
        assert!(!limiter.check_rate_limit(1u32).await);
        assert_eq!(limiter.tracked_keys().await, 1);

        limiter.remove(&1).await;
        assert_eq!(limiter.tracked_keys().await, 0);
        assert!(limiter.check_rate_limit(1u32).await);
    }
}

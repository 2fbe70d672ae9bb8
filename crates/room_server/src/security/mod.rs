//! Request guard: frame size limits and per-connection rate limiting.
//!
//! Every inbound frame passes through [`RequestGuard::check`] before it is
//! parsed. A rejected frame is answered with an error reply and never
//! reaches the room manager.

use crate::config::SecurityConfig;
use crate::connection::ConnectionId;
use std::time::Duration;

pub mod rate_limiter;

pub use rate_limiter::RateLimiter;

#[derive(Debug)]
pub struct RequestGuard {
    config: SecurityConfig,
    rate_limiter: RateLimiter<ConnectionId>,
}

impl RequestGuard {
    /// Creates a new guard with the given configuration
    pub fn new(config: SecurityConfig) -> Self {
        let per_minute = config.max_requests_per_minute.max(1);
        let rate_limiter = RateLimiter::new(per_minute, Duration::from_secs(60) / per_minute);

        Self { config, rate_limiter }
    }

    /// Validates an incoming frame from `connection`.
    pub async fn check(&self, connection: ConnectionId, message: &[u8]) -> Result<(), SecurityError> {
        if message.len() > self.config.max_message_size {
            return Err(SecurityError::MessageTooLarge(message.len()));
        }

        if self.config.enable_rate_limiting && !self.rate_limiter.check_rate_limit(connection).await {
            return Err(SecurityError::RateLimitExceeded(connection));
        }

        Ok(())
    }

    /// Drops the rate-limit state of a closed connection.
    pub async fn forget(&self, connection: ConnectionId) {
        self.rate_limiter.remove(&connection).await;
    }

    /// Total frames refused by the rate limiter.
    pub async fn rate_limited_requests(&self) -> u64 {
        self.rate_limiter.get_blocked_count().await
    }
}

/// Security-related errors
#[derive(Debug, thiserror::Error)]
pub enum SecurityError {
    #[error("Message too large: {0} bytes")]
    MessageTooLarge(usize),
    
    #[error("Rate limit exceeded for connection {0}")]
    RateLimitExceeded(ConnectionId),
}

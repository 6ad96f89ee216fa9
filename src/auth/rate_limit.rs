use std::collections::HashMap;
use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use tokio::sync::RwLock;

#[derive(Debug, Clone)]
pub struct RateLimitConfig {
    pub window_size: Duration,
    pub max_attempts: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            window_size: Duration::minutes(1),
            max_attempts: 10,
        }
    }
}

#[derive(Debug)]
struct AttemptWindow {
    timestamps: Vec<DateTime<Utc>>,
}

impl AttemptWindow {
    fn new() -> Self {
        Self {
            timestamps: Vec::new(),
        }
    }

    fn cleanup_old_attempts(&mut self, window_size: Duration) {
        let cutoff = Utc::now() - window_size;
        self.timestamps.retain(|ts| *ts > cutoff);
    }

    fn add_attempt(&mut self) {
        self.timestamps.push(Utc::now());
    }

    fn attempt_count(&self) -> usize {
        self.timestamps.len()
    }
}

/// Sliding-window limiter for credential endpoints, keyed by the submitted
/// email so a guessing loop against one account is cut off without touching
/// other users.
pub struct RateLimiter {
    windows: Arc<RwLock<HashMap<String, AttemptWindow>>>,
    config: RateLimitConfig,
}

impl RateLimiter {
    pub fn new(config: RateLimitConfig) -> Self {
        Self {
            windows: Arc::new(RwLock::new(HashMap::new())),
            config,
        }
    }

    pub async fn check_rate_limit(&self, email: &str) -> bool {
        let key = email.trim().to_lowercase();
        let mut windows = self.windows.write().await;

        let window = windows.entry(key).or_insert_with(AttemptWindow::new);
        window.cleanup_old_attempts(self.config.window_size);

        if window.attempt_count() < self.config.max_attempts as usize {
            window.add_attempt();
            true
        } else {
            false
        }
    }

    pub async fn cleanup(&self) {
        let mut windows = self.windows.write().await;

        windows.retain(|_, window| {
            window.cleanup_old_attempts(self.config.window_size);
            !window.timestamps.is_empty()
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::time::{sleep, Duration as TokioDuration};

    #[tokio::test]
    async fn test_rate_limiter() {
        let config = RateLimitConfig {
            window_size: Duration::seconds(1),
            max_attempts: 10,
        };
        let limiter = RateLimiter::new(config);

        // Should allow attempts up to the limit
        for _ in 0..10 {
            assert!(limiter.check_rate_limit("user@example.com").await);
        }

        // Should deny attempts over the limit
        assert!(!limiter.check_rate_limit("user@example.com").await);

        // Other accounts are unaffected
        assert!(limiter.check_rate_limit("other@example.com").await);

        // Wait for window to pass
        sleep(TokioDuration::from_millis(1100)).await;

        // Should allow attempts again
        assert!(limiter.check_rate_limit("user@example.com").await);
    }

    #[tokio::test]
    async fn test_key_is_case_insensitive() {
        let config = RateLimitConfig {
            window_size: Duration::seconds(10),
            max_attempts: 2,
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_rate_limit("User@Example.com").await);
        assert!(limiter.check_rate_limit("user@example.com").await);
        assert!(!limiter.check_rate_limit("USER@EXAMPLE.COM").await);
    }

    #[tokio::test]
    async fn test_cleanup_drops_idle_windows() {
        let config = RateLimitConfig {
            window_size: Duration::milliseconds(50),
            max_attempts: 5,
        };
        let limiter = RateLimiter::new(config);

        assert!(limiter.check_rate_limit("user@example.com").await);
        sleep(TokioDuration::from_millis(100)).await;
        limiter.cleanup().await;

        assert!(limiter.windows.read().await.is_empty());
    }
}

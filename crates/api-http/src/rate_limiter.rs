//! Rate Limiter (Token Bucket)
//!
//! Guards the research endpoints against request floods. One bucket per
//! process; burst and refill are env-tunable.

use std::sync::Mutex;
use std::time::Instant;

pub struct RateLimiter {
    state: Mutex<BucketState>,
    max_tokens: f64,
    refill_per_sec: f64,
}

struct BucketState {
    tokens: f64,
    last_refill: Instant,
}

impl RateLimiter {
    /// `max_tokens` is the burst size, `refill_per_sec` the sustained rate.
    pub fn new(max_tokens: u32, refill_per_sec: u32) -> Self {
        Self {
            state: Mutex::new(BucketState {
                tokens: f64::from(max_tokens),
                last_refill: Instant::now(),
            }),
            max_tokens: f64::from(max_tokens),
            refill_per_sec: f64::from(refill_per_sec),
        }
    }

    /// Consume one token; false means rate limited.
    pub fn check(&self) -> bool {
        let mut state = self.state.lock().unwrap();

        let now = Instant::now();
        let elapsed = now.duration_since(state.last_refill).as_secs_f64();
        state.tokens = (state.tokens + elapsed * self.refill_per_sec).min(self.max_tokens);
        state.last_refill = now;

        if state.tokens >= 1.0 {
            state.tokens -= 1.0;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_within_burst() {
        let limiter = RateLimiter::new(10, 10);
        for _ in 0..10 {
            assert!(limiter.check());
        }
        assert!(!limiter.check());
    }

    #[tokio::test]
    async fn test_refills_over_time() {
        let limiter = RateLimiter::new(2, 10); // 10 tokens/sec

        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());

        tokio::time::sleep(std::time::Duration::from_millis(300)).await;
        assert!(limiter.check());
    }

    #[test]
    fn test_burst_is_capped() {
        let limiter = RateLimiter::new(3, 1000);
        std::thread::sleep(std::time::Duration::from_millis(50));
        // Refill cannot exceed the burst size.
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(limiter.check());
        assert!(!limiter.check());
    }
}

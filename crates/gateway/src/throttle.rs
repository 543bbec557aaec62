//! Token bucket for outbound request rate limits
//!
//! Uses `tokio::time::Instant` so paused-time tests can drive refills.

use std::time::Duration;
use tokio::time::Instant;

#[derive(Debug)]
pub struct TokenBucket {
    tokens: f64,
    capacity: f64,
    refill_rate: f64, // tokens per second
    last_update: Instant,
}

impl TokenBucket {
    /// Full bucket of `capacity` tokens refilled at `refill_per_sec`
    pub fn new(capacity: u32, refill_per_sec: f64) -> Self {
        Self {
            tokens: capacity as f64,
            capacity: capacity as f64,
            refill_rate: refill_per_sec.max(f64::MIN_POSITIVE),
            last_update: Instant::now(),
        }
    }

    /// Take `amount` tokens if available. Otherwise returns how long until
    /// enough tokens will have accumulated.
    pub fn try_consume(&mut self, amount: u32) -> Result<(), Duration> {
        self.refill();

        let amount = amount as f64;
        if self.tokens >= amount {
            self.tokens -= amount;
            Ok(())
        } else {
            let deficit = amount - self.tokens;
            Err(Duration::from_secs_f64(deficit / self.refill_rate))
        }
    }

    pub fn available(&mut self) -> u32 {
        self.refill();
        self.tokens as u32
    }

    pub fn capacity(&self) -> u32 {
        self.capacity as u32
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_update);
        self.tokens = (self.tokens + elapsed.as_secs_f64() * self.refill_rate).min(self.capacity);
        self.last_update = now;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn test_bucket_drains_and_refills() {
        let mut bucket = TokenBucket::new(15, 7.0);
        for _ in 0..15 {
            assert!(bucket.try_consume(1).is_ok());
        }
        let wait = bucket.try_consume(1).unwrap_err();
        assert!(wait <= Duration::from_millis(143));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert_eq!(bucket.available(), 7);
    }

    #[tokio::test(start_paused = true)]
    async fn test_refill_capped_at_capacity() {
        let mut bucket = TokenBucket::new(3, 10.0);
        tokio::time::advance(Duration::from_secs(60)).await;
        assert_eq!(bucket.available(), 3);
        assert_eq!(bucket.capacity(), 3);
    }
}

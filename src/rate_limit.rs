use crate::config::RateConfig;
use std::time::Duration;
use tokio::time::{sleep, Instant};

/// Slowest refill accepted; lower or non-finite rates are raised to this
const MIN_REFILL_PER_SEC: f64 = 0.01;

/// Upper bound on a single wait for a token
const MAX_TOKEN_WAIT: Duration = Duration::from_secs(100);

/// Outbound throttle: token bucket followed by a fixed minimum gap
///
/// Not synchronized on its own; it lives inside the connection, which is
/// only ever touched while the executor lock is held.
#[derive(Debug)]
pub struct RateLimiter {
    config: RateConfig,
    tokens: f64,
    last_refill: Instant,
    last_send: Option<Instant>,
}

impl RateLimiter {
    /// Create a limiter with a full bucket
    ///
    /// A refill rate that is not a positive number is raised to
    /// `MIN_REFILL_PER_SEC`, and the bucket always holds at least one token,
    /// so a bad config still throttles.
    pub fn new(mut config: RateConfig) -> Self {
        if !(config.refill_per_sec >= MIN_REFILL_PER_SEC) || !config.refill_per_sec.is_finite() {
            tracing::warn!(
                "Refill rate {} tokens/s is unusable, using {}",
                config.refill_per_sec,
                MIN_REFILL_PER_SEC
            );
            config.refill_per_sec = MIN_REFILL_PER_SEC;
        }
        if !(config.capacity >= 1.0) || !config.capacity.is_finite() {
            config.capacity = 1.0;
        }
        Self {
            tokens: config.capacity,
            config,
            last_refill: Instant::now(),
            last_send: None,
        }
    }

    /// Tokens currently available (after refilling)
    pub fn available(&mut self) -> f64 {
        self.refill();
        self.tokens
    }

    fn refill(&mut self) {
        let now = Instant::now();
        let elapsed = now.duration_since(self.last_refill).as_secs_f64();
        self.tokens = (self.tokens + elapsed * self.config.refill_per_sec).min(self.config.capacity);
        self.last_refill = now;
    }

    /// Wait until a command may be sent, then take a token
    pub async fn acquire(&mut self) {
        self.refill();
        if self.tokens < 1.0 {
            let deficit = (1.0 - self.tokens) / self.config.refill_per_sec;
            let wait = Duration::try_from_secs_f64(deficit)
                .unwrap_or(MAX_TOKEN_WAIT)
                .min(MAX_TOKEN_WAIT);
            tracing::debug!("Rate limit: waiting {:?} for a token", wait);
            sleep(wait).await;
            self.refill();
        }
        self.tokens = (self.tokens - 1.0).max(0.0);

        if let Some(last) = self.last_send {
            let since = last.elapsed();
            if since < self.config.min_gap {
                sleep(self.config.min_gap - since).await;
            }
        }
    }

    /// Record that a send just finished
    pub fn mark_sent(&mut self) {
        self.last_send = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn limiter() -> RateLimiter {
        RateLimiter::new(RateConfig::default())
    }

    #[tokio::test(start_paused = true)]
    async fn burst_within_capacity_does_not_wait() {
        let mut limiter = RateLimiter::new(RateConfig {
            min_gap: Duration::ZERO,
            ..RateConfig::default()
        });
        let start = Instant::now();
        for _ in 0..3 {
            limiter.acquire().await;
            limiter.mark_sent();
        }
        assert_eq!(start.elapsed(), Duration::ZERO);
        assert!(limiter.available() < 1.0);
    }

    #[tokio::test(start_paused = true)]
    async fn empty_bucket_waits_exact_deficit() {
        let mut limiter = RateLimiter::new(RateConfig {
            min_gap: Duration::ZERO,
            ..RateConfig::default()
        });
        for _ in 0..3 {
            limiter.acquire().await;
        }
        let start = Instant::now();
        limiter.acquire().await;
        // one token at 2.5 tokens/s
        let waited = start.elapsed().as_secs_f64();
        assert!((waited - 0.4).abs() < 0.01, "waited {waited}");
    }

    #[tokio::test(start_paused = true)]
    async fn gap_is_enforced_between_sends() {
        let mut limiter = limiter();
        limiter.acquire().await;
        limiter.mark_sent();
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(200));
    }

    #[tokio::test(start_paused = true)]
    async fn back_to_back_commands_respect_both_throttles() {
        let config = RateConfig::default();
        let n = 8;
        let mut limiter = RateLimiter::new(config.clone());
        let start = Instant::now();
        for _ in 0..n {
            limiter.acquire().await;
            limiter.mark_sent();
        }
        let elapsed = start.elapsed().as_secs_f64();
        let by_gap = config.min_gap.as_secs_f64() * (n - 1) as f64;
        let by_bucket = (n as f64 - config.capacity) / config.refill_per_sec;
        assert!(elapsed + 1e-6 >= by_gap.max(by_bucket), "elapsed {elapsed}");
    }

    #[tokio::test(start_paused = true)]
    async fn zero_refill_rate_still_throttles() {
        let mut limiter = RateLimiter::new(RateConfig {
            min_gap: Duration::ZERO,
            capacity: 1.0,
            refill_per_sec: 0.0,
        });
        limiter.acquire().await;
        let start = Instant::now();
        limiter.acquire().await;
        // one token at the 0.01 tokens/s floor
        assert!(start.elapsed() >= Duration::from_secs(99));
    }

    #[tokio::test(start_paused = true)]
    async fn tiny_refill_rate_waits_bounded_time() {
        for rate in [1e-300, f64::NAN, -2.5] {
            let mut limiter = RateLimiter::new(RateConfig {
                min_gap: Duration::ZERO,
                capacity: 0.0,
                refill_per_sec: rate,
            });
            limiter.acquire().await;
            let start = Instant::now();
            limiter.acquire().await;
            let waited = start.elapsed();
            assert!(waited > Duration::ZERO, "rate {rate}");
            assert!(waited <= MAX_TOKEN_WAIT + Duration::from_millis(2), "rate {rate}");
        }
    }

    #[tokio::test(start_paused = true)]
    async fn idle_time_refills_up_to_capacity() {
        let mut limiter = limiter();
        for _ in 0..3 {
            limiter.acquire().await;
            limiter.mark_sent();
        }
        sleep(Duration::from_secs(10)).await;
        assert!((limiter.available() - 3.0).abs() < 1e-9);
    }
}

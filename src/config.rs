use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default controller TCP port
pub const DEFAULT_PORT: u16 = 10001;

const DEFAULT_IO_TIMEOUT: Duration = Duration::from_secs(12);
const DEFAULT_SETTLE_DELAY: Duration = Duration::from_millis(200);
const DEFAULT_MIN_GAP: Duration = Duration::from_millis(200);

/// Connection settings for a ZenseHome controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientConfig {
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Shared secret sent with `Login`
    pub code: u32,

    /// Bound on connect, each write and each read
    #[serde(default = "default_io_timeout", with = "secs")]
    pub io_timeout: Duration,

    /// Pause after a successful login before the first real command
    #[serde(default = "default_settle_delay", with = "secs")]
    pub settle_delay: Duration,

    #[serde(default)]
    pub rate: RateConfig,

    #[serde(default)]
    pub retry: RetryPolicy,
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_io_timeout() -> Duration {
    DEFAULT_IO_TIMEOUT
}

fn default_settle_delay() -> Duration {
    DEFAULT_SETTLE_DELAY
}

impl ClientConfig {
    /// Settings for `host:port` with every tunable at its default
    pub fn new(host: impl Into<String>, port: u16, code: u32) -> Self {
        Self {
            host: host.into(),
            port,
            code,
            io_timeout: DEFAULT_IO_TIMEOUT,
            settle_delay: DEFAULT_SETTLE_DELAY,
            rate: RateConfig::default(),
            retry: RetryPolicy::default(),
        }
    }

    pub fn with_io_timeout(mut self, timeout: Duration) -> Self {
        self.io_timeout = timeout;
        self
    }

    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    pub fn with_rate(mut self, rate: RateConfig) -> Self {
        self.rate = rate;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// `host:port` for log messages and connect
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Outbound throttling applied before every command
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RateConfig {
    /// Minimum time between the end of one send and the start of the next
    #[serde(default = "default_min_gap", with = "secs")]
    pub min_gap: Duration,

    /// Token bucket size (burst allowance)
    #[serde(default = "default_capacity")]
    pub capacity: f64,

    /// Tokens added per second
    #[serde(default = "default_refill_per_sec")]
    pub refill_per_sec: f64,
}

fn default_min_gap() -> Duration {
    DEFAULT_MIN_GAP
}

fn default_capacity() -> f64 {
    3.0
}

fn default_refill_per_sec() -> f64 {
    2.5
}

impl Default for RateConfig {
    fn default() -> Self {
        Self {
            min_gap: DEFAULT_MIN_GAP,
            capacity: default_capacity(),
            refill_per_sec: default_refill_per_sec(),
        }
    }
}

/// Retry and exponential backoff for failed exchanges
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    #[serde(default = "default_initial_backoff", with = "secs")]
    pub initial_backoff: Duration,

    #[serde(default = "default_backoff_factor")]
    pub backoff_factor: f64,

    #[serde(default = "default_max_backoff", with = "secs")]
    pub max_backoff: Duration,
}

fn default_max_retries() -> u32 {
    2
}

fn default_initial_backoff() -> Duration {
    Duration::from_millis(250)
}

fn default_backoff_factor() -> f64 {
    1.7
}

fn default_max_backoff() -> Duration {
    Duration::from_secs(2)
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            initial_backoff: default_initial_backoff(),
            backoff_factor: default_backoff_factor(),
            max_backoff: default_max_backoff(),
        }
    }
}

impl RetryPolicy {
    /// Delay to wait after the next failure, given the delay used last time
    ///
    /// Factors below 1 (or NaN) are treated as 1; an overflowing product
    /// saturates at `max_backoff`.
    pub fn next_backoff(&self, previous: Duration) -> Duration {
        let factor = self.backoff_factor.max(1.0);
        Duration::try_from_secs_f64(previous.as_secs_f64() * factor)
            .unwrap_or(self.max_backoff)
            .min(self.max_backoff)
    }

    /// Successive backoff delays, starting at `initial_backoff`
    pub fn delays(&self) -> impl Iterator<Item = Duration> + '_ {
        std::iter::successors(Some(self.initial_backoff.min(self.max_backoff)), move |d| {
            Some(self.next_backoff(*d))
        })
    }
}

/// Durations as fractional seconds
mod secs {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_f64(d.as_secs_f64())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let secs = f64::deserialize(d)?;
        Duration::try_from_secs_f64(secs).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_grows_then_caps() {
        let policy = RetryPolicy::default();
        let delays: Vec<f64> = policy.delays().take(6).map(|d| d.as_secs_f64()).collect();
        let expected = [0.25, 0.425, 0.7225, 1.22825, 2.0, 2.0];
        for (got, want) in delays.iter().zip(expected) {
            assert!((got - want).abs() < 1e-6, "got {got}, want {want}");
        }
    }

    #[test]
    fn bad_backoff_factor_does_not_panic() {
        for factor in [-1.0, 0.0, f64::NAN, f64::INFINITY, 1e308] {
            let policy = RetryPolicy {
                backoff_factor: factor,
                ..RetryPolicy::default()
            };
            let delays: Vec<Duration> = policy.delays().take(4).collect();
            assert!(delays.iter().all(|d| *d <= policy.max_backoff), "factor {factor}");
            assert!(delays.windows(2).all(|w| w[1] >= w[0]), "factor {factor}");
        }
    }

    #[test]
    fn config_from_json_fills_defaults() {
        let config: ClientConfig =
            serde_json::from_str(r#"{"host": "10.0.0.5", "code": 4321}"#).unwrap();
        assert_eq!(config.port, DEFAULT_PORT);
        assert_eq!(config.io_timeout, Duration::from_secs(12));
        assert_eq!(config.settle_delay, Duration::from_millis(200));
        assert_eq!(config.rate.capacity, 3.0);
        assert_eq!(config.retry.max_retries, 2);
        assert_eq!(config.addr(), "10.0.0.5:10001");
    }

    #[test]
    fn durations_are_seconds_in_json() {
        let config: ClientConfig = serde_json::from_str(
            r#"{"host": "h", "code": 1, "io_timeout": 1.5, "rate": {"min_gap": 0.05}}"#,
        )
        .unwrap();
        assert_eq!(config.io_timeout, Duration::from_millis(1500));
        assert_eq!(config.rate.min_gap, Duration::from_millis(50));
        assert_eq!(config.rate.refill_per_sec, 2.5);

        let json = serde_json::to_value(&config).unwrap();
        assert_eq!(json["io_timeout"], 1.5);
    }
}

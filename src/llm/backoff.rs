//! Backoff schedule, jitter sources and the wait abstraction
//!
//! Attempt `i` (0-indexed) waits `2^i * base_delay + jitter` before the next
//! attempt, with jitter uniform in `[0, max_jitter)`.

use async_trait::async_trait;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

/// Default base delay for attempt 0
pub const DEFAULT_BASE_DELAY: Duration = Duration::from_millis(1000);

/// Default upper bound (exclusive) of the jitter component
pub const DEFAULT_MAX_JITTER: Duration = Duration::from_millis(1000);

/// Retry tuning shared by every request a client makes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub base_delay: Duration,
    pub max_jitter: Duration,
    /// Treat 5xx responses as transient
    pub retry_server_errors: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: DEFAULT_BASE_DELAY,
            max_jitter: DEFAULT_MAX_JITTER,
            retry_server_errors: false,
        }
    }
}

impl RetryPolicy {
    /// Exponential part of the wait after attempt `attempt`
    pub fn base_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(2u32.saturating_pow(attempt))
    }

    /// Full wait after attempt `attempt`, jitter included
    pub fn delay(&self, attempt: u32, jitter: &dyn Jitter) -> Duration {
        let mut extra = jitter.sample(self.max_jitter);
        if !self.max_jitter.is_zero() && extra >= self.max_jitter {
            // Keep the upper bound exclusive even for a misbehaving source
            extra = self.max_jitter.saturating_sub(Duration::from_nanos(1));
        }
        self.base_for(attempt).saturating_add(extra)
    }
}

/// Source of the random component added to each backoff wait
pub trait Jitter: Send + Sync {
    /// Sample a duration in `[0, max)`; `Duration::ZERO` when `max` is zero
    fn sample(&self, max: Duration) -> Duration;
}

/// Thread-local RNG jitter for production use
#[derive(Debug, Clone, Copy, Default)]
pub struct RandomJitter;

impl Jitter for RandomJitter {
    fn sample(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let nanos = u64::try_from(max.as_nanos()).unwrap_or(u64::MAX);
        Duration::from_nanos(rand::thread_rng().gen_range(0..nanos))
    }
}

/// Deterministic jitter: the same seed replays the same schedule
pub struct SeededJitter {
    rng: Mutex<StdRng>,
}

impl SeededJitter {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }
}

impl Jitter for SeededJitter {
    fn sample(&self, max: Duration) -> Duration {
        if max.is_zero() {
            return Duration::ZERO;
        }
        let millis = u64::try_from(max.as_millis()).unwrap_or(u64::MAX).max(1);
        let mut rng = self.rng.lock().unwrap_or_else(PoisonError::into_inner);
        Duration::from_millis(rng.gen_range(0..millis))
    }
}

/// Suspends the retry loop between attempts
#[async_trait]
pub trait Sleeper: Send + Sync {
    async fn sleep(&self, duration: Duration);
}

/// Non-blocking wait on the tokio timer
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

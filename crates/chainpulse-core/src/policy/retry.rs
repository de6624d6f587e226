//! Backoff schedules shared by the health prober and the resilient call wrapper.

use std::time::Duration;

/// How the delay grows between attempts.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Backoff {
    /// `initial × attempt` — used between probe attempts.
    Linear,
    /// `initial × multiplier^(attempt − 1)` — used between resilient-call attempts.
    Exponential { multiplier: f64 },
}

/// Configuration for the retry policy.
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum number of attempts, counting the first try. Values below 1 mean 1.
    pub max_attempts: u32,
    /// Delay after the first failed attempt.
    pub initial_backoff: Duration,
    /// Maximum backoff delay (caps growth).
    pub max_backoff: Duration,
    /// Growth of the delay between attempts.
    pub backoff: Backoff,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            initial_backoff: Duration::from_millis(1000),
            max_backoff: Duration::from_secs(30),
            backoff: Backoff::Exponential { multiplier: 1.5 },
        }
    }
}

/// Stateless retry policy — computes the next delay given the attempt number.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub config: RetryConfig,
}

impl RetryPolicy {
    pub fn new(config: RetryConfig) -> Self {
        Self { config }
    }

    /// `max_attempts` tries with `initial × attempt` between them.
    pub fn linear(max_attempts: u32, initial: Duration) -> Self {
        Self::new(RetryConfig {
            max_attempts,
            initial_backoff: initial,
            backoff: Backoff::Linear,
            ..Default::default()
        })
    }

    /// `max_attempts` tries with `initial × multiplier^(n−1)` between them.
    pub fn exponential(max_attempts: u32, initial: Duration, multiplier: f64) -> Self {
        Self::new(RetryConfig {
            max_attempts,
            initial_backoff: initial,
            backoff: Backoff::Exponential { multiplier },
            ..Default::default()
        })
    }

    /// Effective attempt budget (never below one).
    pub fn max_attempts(&self) -> u32 {
        self.config.max_attempts.max(1)
    }

    /// Returns the delay to wait after the `attempt`-th failure (1-based).
    /// Returns `None` once `attempt` has used up the budget.
    pub fn next_delay(&self, attempt: u32) -> Option<Duration> {
        if attempt == 0 || attempt >= self.max_attempts() {
            return None;
        }
        let initial_ms = self.config.initial_backoff.as_millis() as f64;
        let base_ms = match self.config.backoff {
            Backoff::Linear => initial_ms * attempt as f64,
            Backoff::Exponential { multiplier } => {
                initial_ms * multiplier.max(1.0).powi((attempt - 1) as i32)
            }
        };
        let cap_ms = self.config.max_backoff.as_millis() as f64;
        Some(Duration::from_millis(base_ms.min(cap_ms) as u64))
    }
}

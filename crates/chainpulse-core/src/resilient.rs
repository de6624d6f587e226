//! Resilient call wrapper — retry with backoff and endpoint rotation.
//!
//! Every attempt re-resolves the ranking and picks the best endpoint not yet
//! tried by this call, so a failing endpoint is abandoned instead of being
//! hammered. Attempts are strictly sequential.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::config::duration_ms;
use crate::error::{CallError, FailureClass, TransportError};
use crate::policy::RetryPolicy;
use crate::pool::{ProviderPool, RankedProvider};
use crate::transport::RpcTransport;

/// Backoff growth between resilient-call attempts.
pub const CALL_BACKOFF_MULTIPLIER: f64 = 1.5;

/// Attempt budget, initial delay and per-attempt bound of one resilient call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CallPolicy {
    /// Total attempts, including the first one.
    pub max_retries: u32,
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// An attempt still pending after this counts as a transient timeout.
    #[serde(with = "duration_ms")]
    pub attempt_timeout: Duration,
}

impl Default for CallPolicy {
    fn default() -> Self {
        Self {
            max_retries: 5,
            base_delay: Duration::from_millis(1500),
            attempt_timeout: Duration::from_secs(4),
        }
    }
}

impl CallPolicy {
    pub fn new(max_retries: u32, base_delay: Duration) -> Self {
        Self {
            max_retries,
            base_delay,
            ..Default::default()
        }
    }

    pub fn with_attempt_timeout(mut self, attempt_timeout: Duration) -> Self {
        self.attempt_timeout = attempt_timeout;
        self
    }

    fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::exponential(self.max_retries, self.base_delay, CALL_BACKOFF_MULTIPLIER)
    }
}

/// Runs remote reads against whatever the pool currently ranks best.
pub struct ResilientCaller {
    pool: Arc<ProviderPool>,
    offline_after_failures: u32,
}

impl ResilientCaller {
    pub fn new(pool: Arc<ProviderPool>, offline_after_failures: u32) -> Self {
        Self {
            pool,
            offline_after_failures,
        }
    }

    /// Run `op` with rotation and backoff.
    ///
    /// Each attempt is bounded by `policy.attempt_timeout`. Timeouts, rate-limit
    /// and transient failures are recorded against the endpoint and
    /// retried on the next-best one; terminal failures return immediately.
    pub async fn call<T, F, Fut>(&self, policy: &CallPolicy, op: F) -> Result<T, CallError>
    where
        F: Fn(Arc<dyn RpcTransport>) -> Fut,
        Fut: Future<Output = Result<T, TransportError>>,
    {
        let retry = policy.retry_policy();
        let registry = self.pool.registry();
        let mut tried: Vec<String> = Vec::new();
        let mut last_error: Option<TransportError> = None;
        let mut attempt = 0u32;

        loop {
            let Some(provider) = self.select(&tried) else {
                return Err(match last_error {
                    Some(last_error) => CallError::ExhaustedRetries {
                        attempts: attempt,
                        last_error,
                    },
                    None => CallError::NoProvidersAvailable,
                });
            };
            attempt += 1;

            let outcome = tokio::time::timeout(policy.attempt_timeout, op(provider.transport.clone()))
                .await
                .unwrap_or_else(|_| {
                    Err(TransportError::Timeout {
                        ms: policy.attempt_timeout.as_millis() as u64,
                    })
                });
            let err = match outcome {
                Ok(value) => {
                    registry.record_call_success(&provider.url);
                    return Ok(value);
                }
                Err(e) => e,
            };

            let class = err.classify();
            if !class.is_retryable() {
                tracing::debug!(url = %provider.url, error = %err, "request rejected");
                return Err(CallError::Rejected {
                    url: provider.url,
                    source: err,
                });
            }

            registry.record_call_failure(&provider.url, &err.to_string(), self.offline_after_failures);
            match retry.next_delay(attempt) {
                Some(delay) => {
                    tracing::warn!(
                        attempt,
                        delay_ms = delay.as_millis() as u64,
                        rate_limited = class == FailureClass::RateLimited,
                        error = %err,
                        url = %provider.url,
                        "rotating endpoint and retrying"
                    );
                    tried.push(provider.url);
                    last_error = Some(err);
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(
                        attempt,
                        error = %err,
                        url = %provider.url,
                        "max retries exceeded"
                    );
                    return Err(CallError::ExhaustedRetries {
                        attempts: attempt,
                        last_error: err,
                    });
                }
            }
        }
    }

    /// Best endpoint not yet tried; once all were tried, the best one that
    /// did not fail last.
    fn select(&self, tried: &[String]) -> Option<RankedProvider> {
        let ranked = self.pool.ranked_providers();
        let last = tried.last();
        ranked
            .iter()
            .find(|p| !tried.contains(&p.url))
            .or_else(|| ranked.iter().find(|p| Some(&p.url) != last))
            .or_else(|| ranked.first())
            .cloned()
    }
}

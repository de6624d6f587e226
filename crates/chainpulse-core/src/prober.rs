//! Health prober — verifies every endpoint concurrently and records the outcome.
//!
//! A probe fetches `eth_blockNumber` and `eth_chainId` through the pooled
//! connection and accepts the endpoint only if the chain id matches. Each
//! endpoint gets its own task; one endpoint failing never affects another.

use std::collections::HashMap;
use std::time::{Duration, Instant};

use futures::future::join_all;
use serde::{Deserialize, Serialize};

use crate::config::duration_ms;
use crate::error::ProbeError;
use crate::policy::RetryPolicy;
use crate::pool::ProviderPool;
use crate::transport::RpcTransportExt;

/// Probe tuning.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProbeConfig {
    /// Attempts per endpoint and round.
    pub retries_per_endpoint: u32,
    /// Chain id an endpoint must report to count as online.
    pub expected_chain_id: u64,
    /// Backoff unit; attempt `n` is followed by `base_delay × n`.
    #[serde(with = "duration_ms")]
    pub base_delay: Duration,
    /// Upper bound of a single attempt.
    #[serde(with = "duration_ms")]
    pub attempt_timeout: Duration,
}

impl Default for ProbeConfig {
    fn default() -> Self {
        Self {
            retries_per_endpoint: 3,
            expected_chain_id: 56,
            base_delay: Duration::from_millis(1000),
            attempt_timeout: Duration::from_secs(10),
        }
    }
}

/// What one probe attempt observed on a healthy endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeSuccess {
    pub latency_ms: u64,
    pub block_number: u64,
    pub chain_id: u64,
}

/// Outcome of probing one endpoint for one round.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProbeResult {
    pub url: String,
    pub attempts: u32,
    pub outcome: Result<ProbeSuccess, ProbeError>,
}

impl ProbeResult {
    pub fn is_online(&self) -> bool {
        self.outcome.is_ok()
    }
}

/// Issues verification calls and writes the results into the registry.
#[derive(Debug, Clone, Default)]
pub struct HealthProber {
    config: ProbeConfig,
}

impl HealthProber {
    pub fn new(config: ProbeConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ProbeConfig {
        &self.config
    }

    /// Probe `endpoints` concurrently. Results are keyed by URL; completion
    /// order across endpoints is unspecified.
    pub async fn probe_all(
        &self,
        pool: &ProviderPool,
        endpoints: &[String],
    ) -> HashMap<String, ProbeResult> {
        tracing::info!(count = endpoints.len(), "probing RPC endpoints");
        let results = join_all(endpoints.iter().map(|url| self.probe_endpoint(pool, url))).await;

        let online = results.iter().filter(|r| r.is_online()).count();
        tracing::info!(online, total = results.len(), "probe round finished");
        results.into_iter().map(|r| (r.url.clone(), r)).collect()
    }

    /// Probe one endpoint with retries, then record the outcome.
    pub async fn probe_endpoint(&self, pool: &ProviderPool, url: &str) -> ProbeResult {
        let retry = RetryPolicy::linear(self.config.retries_per_endpoint, self.config.base_delay);
        let mut attempt = 0u32;
        let outcome = loop {
            attempt += 1;
            match self.attempt(pool, url).await {
                Ok(success) => break Ok(success),
                // Retrying cannot change which chain an endpoint serves.
                Err(e @ ProbeError::WrongNetwork { .. }) => break Err(e),
                Err(e) => match retry.next_delay(attempt) {
                    Some(delay) => {
                        tracing::debug!(
                            url,
                            attempt,
                            delay_ms = delay.as_millis() as u64,
                            error = %e,
                            "probe failed, retrying"
                        );
                        tokio::time::sleep(delay).await;
                    }
                    None => break Err(e),
                },
            }
        };

        let registry = pool.registry();
        match &outcome {
            Ok(s) => {
                registry.record_probe_success(url, s.latency_ms, s.chain_id, s.block_number);
                tracing::info!(
                    url,
                    block = s.block_number,
                    latency_ms = s.latency_ms,
                    "endpoint online"
                );
            }
            Err(e) => {
                registry.record_probe_failure(url, &e.to_string(), e.observed_chain_id());
                match e {
                    ProbeError::WrongNetwork { expected, actual, .. } => tracing::warn!(
                        url,
                        expected,
                        actual,
                        "endpoint serves the wrong network"
                    ),
                    ProbeError::EndpointUnreachable { reason, .. } => tracing::warn!(
                        url,
                        attempts = attempt,
                        error = %reason,
                        "endpoint offline"
                    ),
                }
            }
        }

        ProbeResult {
            url: url.to_string(),
            attempts: attempt,
            outcome,
        }
    }

    async fn attempt(&self, pool: &ProviderPool, url: &str) -> Result<ProbeSuccess, ProbeError> {
        let offline = |reason: String| ProbeError::EndpointUnreachable {
            url: url.to_string(),
            reason,
        };

        let transport = pool.connection(url).map_err(|e| offline(e.to_string()))?;
        let started = Instant::now();
        let verify = async { tokio::try_join!(transport.block_number(), transport.chain_id()) };
        let (block_number, chain_id) = tokio::time::timeout(self.config.attempt_timeout, verify)
            .await
            .map_err(|_| {
                offline(format!(
                    "timed out after {}ms",
                    self.config.attempt_timeout.as_millis()
                ))
            })?
            .map_err(|e| offline(e.to_string()))?;
        let latency_ms = started.elapsed().as_millis() as u64;

        if chain_id != self.config.expected_chain_id {
            return Err(ProbeError::WrongNetwork {
                url: url.to_string(),
                expected: self.config.expected_chain_id,
                actual: chain_id,
            });
        }
        Ok(ProbeSuccess {
            latency_ms,
            block_number,
            chain_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::{Behavior, MockFactory, MockTransport};
    use crate::registry::EndpointRegistry;
    use crate::scorer::ScoringWeights;
    use crate::transport::{EndpointStatus, RpcTransport};
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    fn fast_config(retries: u32) -> ProbeConfig {
        ProbeConfig {
            retries_per_endpoint: retries,
            expected_chain_id: 56,
            base_delay: Duration::from_millis(5),
            attempt_timeout: Duration::from_millis(100),
        }
    }

    fn pool_of(transports: Vec<Arc<MockTransport>>) -> (ProviderPool, Vec<String>) {
        let urls: Vec<String> = transports.iter().map(|t| t.url().to_string()).collect();
        let mut factory = MockFactory::default();
        for t in transports {
            factory = factory.with(t);
        }
        let pool = ProviderPool::new(
            Arc::new(EndpointRegistry::new(urls.clone())),
            Arc::new(factory),
            ScoringWeights::default(),
        );
        (pool, urls)
    }

    #[tokio::test]
    async fn healthy_endpoint_goes_online() {
        let (pool, urls) = pool_of(vec![MockTransport::new(
            "https://a.com",
            Behavior::Healthy { delay: Duration::from_millis(20) },
        )]);
        let results = HealthProber::new(fast_config(3)).probe_all(&pool, &urls).await;

        let result = &results["https://a.com"];
        let success = result.outcome.as_ref().unwrap();
        assert_eq!(result.attempts, 1);
        assert_eq!(success.chain_id, 56);
        assert_eq!(success.block_number, 0x2a3f1c0);
        assert!(success.latency_ms >= 20);

        let rec = pool.registry().get("https://a.com").unwrap();
        assert_eq!(rec.status, EndpointStatus::Online);
        assert_eq!(rec.latency_ms, Some(success.latency_ms));
        assert_eq!(rec.success_count, 1);
    }

    #[tokio::test]
    async fn exhausted_retries_mark_offline() {
        let down = MockTransport::new("https://down.com", Behavior::Down);
        let (pool, urls) = pool_of(vec![down.clone()]);
        let results = HealthProber::new(fast_config(3)).probe_all(&pool, &urls).await;

        let result = &results["https://down.com"];
        assert_eq!(result.attempts, 3);
        assert!(matches!(
            result.outcome,
            Err(ProbeError::EndpointUnreachable { .. })
        ));
        let rec = pool.registry().get("https://down.com").unwrap();
        assert_eq!(rec.status, EndpointStatus::Offline);
        assert_eq!(rec.failure_count, 1);
        assert!(rec.last_error.unwrap().contains("connection refused"));
    }

    #[tokio::test]
    async fn wrong_network_is_not_retried() {
        let foreign = MockTransport::new("https://eth.com", Behavior::WrongChain(1));
        let (pool, urls) = pool_of(vec![foreign]);
        let results = HealthProber::new(fast_config(3)).probe_all(&pool, &urls).await;

        let result = &results["https://eth.com"];
        assert_eq!(result.attempts, 1);
        assert_eq!(
            result.outcome,
            Err(ProbeError::WrongNetwork {
                url: "https://eth.com".into(),
                expected: 56,
                actual: 1,
            })
        );
        let rec = pool.registry().get("https://eth.com").unwrap();
        assert!(!rec.is_online());
        assert_eq!(rec.chain_id, Some(1));
    }

    #[tokio::test]
    async fn hanging_endpoint_times_out_without_blocking_others() {
        let (pool, urls) = pool_of(vec![
            MockTransport::new("https://hang.com", Behavior::Hang),
            MockTransport::new("https://ok.com", Behavior::Healthy { delay: Duration::ZERO }),
        ]);
        let started = Instant::now();
        let results = HealthProber::new(fast_config(2)).probe_all(&pool, &urls).await;

        // two 100ms attempts plus a 5ms pause, nowhere near the hang
        assert!(started.elapsed() < Duration::from_secs(2));
        assert!(!results["https://hang.com"].is_online());
        assert!(results["https://ok.com"].is_online());
    }

    #[tokio::test]
    async fn connection_refusal_counts_as_failed_attempt() {
        let pool = ProviderPool::new(
            Arc::new(EndpointRegistry::new(["https://refused.com"])),
            Arc::new(MockFactory::default().refusing("https://refused.com")),
            ScoringWeights::default(),
        );
        let result = HealthProber::new(fast_config(2))
            .probe_endpoint(&pool, "https://refused.com")
            .await;
        assert_eq!(result.attempts, 2);
        assert!(!result.is_online());
    }

    #[tokio::test]
    async fn recovery_after_outage() {
        let flaky = MockTransport::new("https://flaky.com", Behavior::Down);
        let (pool, urls) = pool_of(vec![flaky.clone()]);
        let prober = HealthProber::new(fast_config(1));

        prober.probe_all(&pool, &urls).await;
        assert!(!pool.registry().get("https://flaky.com").unwrap().is_online());

        flaky.set(Behavior::Healthy { delay: Duration::ZERO });
        prober.probe_all(&pool, &urls).await;
        let rec = pool.registry().get("https://flaky.com").unwrap();
        assert!(rec.is_online());
        assert_eq!((rec.success_count, rec.failure_count), (1, 1));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn overlapping_rounds_keep_records_consistent() {
        const ROUNDS: u64 = 8;
        const CALL_FAILURES: u64 = 200;

        let (pool, urls) = pool_of(vec![
            MockTransport::new("https://a.com", Behavior::Healthy { delay: Duration::from_millis(1) }),
            MockTransport::new("https://b.com", Behavior::WrongChain(97)),
            MockTransport::new("https://c.com", Behavior::Down),
            MockTransport::new("https://d.com", Behavior::Healthy { delay: Duration::from_millis(2) }),
        ]);
        let pool = Arc::new(pool);
        let prober = Arc::new(HealthProber::new(fast_config(1)));
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let pool = pool.clone();
            let done = done.clone();
            tokio::spawn(async move {
                while !done.load(Ordering::SeqCst) {
                    for rec in pool.registry().online() {
                        assert_eq!(rec.chain_id, Some(56), "{rec:?}");
                        assert!(rec.latency_ms.is_some(), "{rec:?}");
                    }
                    tokio::task::yield_now().await;
                }
            })
        };

        let mut tasks = Vec::new();
        for _ in 0..ROUNDS {
            let (pool, prober, urls) = (pool.clone(), prober.clone(), urls.clone());
            tasks.push(tokio::spawn(async move {
                prober.probe_all(&pool, &urls).await;
            }));
        }
        for i in 0..CALL_FAILURES {
            let pool = pool.clone();
            tasks.push(tokio::spawn(async move {
                pool.registry()
                    .record_call_failure("https://a.com", &format!("failure {i}"), 0);
            }));
        }
        for task in tasks {
            task.await.unwrap();
        }
        done.store(true, Ordering::SeqCst);
        reader.await.unwrap();

        let registry = pool.registry();
        let a = registry.get("https://a.com").unwrap();
        assert_eq!(a.status, EndpointStatus::Online);
        assert_eq!(a.success_count, ROUNDS);
        assert_eq!(a.failure_count, CALL_FAILURES);

        let b = registry.get("https://b.com").unwrap();
        assert_eq!(b.status, EndpointStatus::Offline);
        assert_eq!(b.failure_count, ROUNDS);
        assert_eq!(b.chain_id, Some(97));

        assert_eq!(registry.get("https://c.com").unwrap().failure_count, ROUNDS);
        assert_eq!(registry.get("https://d.com").unwrap().success_count, ROUNDS);
        let online: Vec<String> = registry.online().into_iter().map(|r| r.url).collect();
        assert_eq!(online, vec!["https://a.com", "https://d.com"]);
    }
}

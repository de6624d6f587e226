//! `ChainConnector` — one explicit instance wiring registry, pool, prober and caller.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;

use crate::config::ConnectorConfig;
use crate::pool::{ProviderPool, RankedProvider};
use crate::prober::{HealthProber, ProbeResult};
use crate::registry::EndpointRegistry;
use crate::resilient::{CallPolicy, ResilientCaller};
use crate::transport::TransportFactory;

/// Summary of the connector's view of the network.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub is_connected: bool,
    pub working_count: usize,
    pub total_count: usize,
    pub chain_id: u64,
    /// Head last observed by the best endpoint.
    pub block_number: Option<u64>,
    /// URL of the best endpoint.
    pub best_provider: Option<String>,
}

pub struct ChainConnector {
    config: ConnectorConfig,
    pool: Arc<ProviderPool>,
    prober: HealthProber,
    caller: ResilientCaller,
}

impl ChainConnector {
    pub fn new(config: ConnectorConfig, factory: Arc<dyn TransportFactory>) -> Self {
        let registry = Arc::new(EndpointRegistry::new(config.endpoints.iter().cloned()));
        let pool = Arc::new(ProviderPool::new(registry, factory, config.weights));
        let prober = HealthProber::new(config.probe.clone());
        let caller = ResilientCaller::new(pool.clone(), config.offline_after_failures);
        Self {
            config,
            pool,
            prober,
            caller,
        }
    }

    pub fn config(&self) -> &ConnectorConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        self.pool.registry()
    }

    pub fn pool(&self) -> &Arc<ProviderPool> {
        &self.pool
    }

    pub fn caller(&self) -> &ResilientCaller {
        &self.caller
    }

    /// Default policy for calls through [`caller`](Self::caller).
    pub fn call_policy(&self) -> &CallPolicy {
        &self.config.call
    }

    /// Probe every configured endpoint once.
    pub async fn probe(&self) -> HashMap<String, ProbeResult> {
        let urls = self.registry().urls();
        self.prober.probe_all(&self.pool, &urls).await
    }

    /// Run the first probe round. Returns whether at least one endpoint is online.
    pub async fn initialize(&self) -> bool {
        self.probe().await;
        let status = self.connection_status();
        if status.is_connected {
            tracing::info!(
                working = status.working_count,
                total = status.total_count,
                best = status.best_provider.as_deref().unwrap_or_default(),
                "connector initialized"
            );
        } else {
            tracing::error!(total = status.total_count, "no working RPC endpoints");
        }
        status.is_connected
    }

    pub fn best_provider(&self) -> Option<RankedProvider> {
        self.pool.best_provider()
    }

    /// Online endpoints, best first.
    pub fn working_providers(&self) -> Vec<RankedProvider> {
        self.pool.ranked_providers()
    }

    pub fn connection_status(&self) -> ConnectionStatus {
        let ranked = self.working_providers();
        let best = ranked.first().map(|p| p.url.clone());
        let block_number = best
            .as_deref()
            .and_then(|url| self.registry().get(url))
            .and_then(|rec| rec.block_number);
        ConnectionStatus {
            is_connected: !ranked.is_empty(),
            working_count: ranked.len(),
            total_count: self.registry().len(),
            chain_id: self.config.expected_chain_id(),
            block_number,
            best_provider: best,
        }
    }

    /// Administrative reset of one endpoint's success/failure history.
    pub fn reset_counters(&self, url: &str) -> bool {
        let reset = self.registry().reset_counters(url);
        if reset {
            tracing::info!(url, "endpoint counters reset");
        }
        reset
    }

    /// Start the background loop if `probe_interval` is configured.
    pub fn spawn_configured_probe_loop(self: &Arc<Self>) -> Option<JoinHandle<()>> {
        self.config
            .probe_interval
            .map(|interval| self.clone().spawn_probe_loop(interval))
    }

    /// Re-probe every `interval` until the handle is aborted. The first round
    /// runs one interval after spawning.
    pub fn spawn_probe_loop(self: Arc<Self>, interval: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let results = self.probe().await;
                let online = results.values().filter(|r| r.is_online()).count();
                tracing::debug!(online, total = results.len(), "periodic probe finished");
            }
        })
    }
}

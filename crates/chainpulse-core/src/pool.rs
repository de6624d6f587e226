//! Provider pool — ranks online endpoints and owns their live connections.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::error::TransportError;
use crate::registry::EndpointRegistry;
use crate::scorer::{score_all, ScoringWeights};
use crate::transport::{RpcTransport, TransportFactory};

/// One online endpoint handed to a caller for the duration of a call.
#[derive(Clone)]
pub struct RankedProvider {
    pub url: String,
    pub score: f64,
    pub latency_ms: Option<u64>,
    pub transport: Arc<dyn RpcTransport>,
}

impl std::fmt::Debug for RankedProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RankedProvider")
            .field("url", &self.url)
            .field("score", &self.score)
            .field("latency_ms", &self.latency_ms)
            .finish()
    }
}

/// Score-ranked provider pool with a lazily filled connection cache.
///
/// Only endpoints whose registry status is `Online` are handed out. Equal
/// scores keep registry order, so the ranking is deterministic.
pub struct ProviderPool {
    registry: Arc<EndpointRegistry>,
    factory: Arc<dyn TransportFactory>,
    connections: Mutex<HashMap<String, Arc<dyn RpcTransport>>>,
    weights: ScoringWeights,
}

impl ProviderPool {
    pub fn new(
        registry: Arc<EndpointRegistry>,
        factory: Arc<dyn TransportFactory>,
        weights: ScoringWeights,
    ) -> Self {
        Self {
            registry,
            factory,
            connections: Mutex::new(HashMap::new()),
            weights,
        }
    }

    pub fn registry(&self) -> &Arc<EndpointRegistry> {
        &self.registry
    }

    pub fn weights(&self) -> &ScoringWeights {
        &self.weights
    }

    fn cache(&self) -> MutexGuard<'_, HashMap<String, Arc<dyn RpcTransport>>> {
        self.connections.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Return the cached connection for `url`, creating it on first use.
    ///
    /// Creation errors are returned as-is; the caller decides how to record them.
    pub fn connection(&self, url: &str) -> Result<Arc<dyn RpcTransport>, TransportError> {
        let mut cache = self.cache();
        if let Some(existing) = cache.get(url) {
            return Ok(existing.clone());
        }
        let transport = self.factory.connect(url)?;
        tracing::debug!(url, "opened connection");
        cache.insert(url.to_string(), transport.clone());
        Ok(transport)
    }

    /// Online endpoints ranked by score, best first.
    ///
    /// An endpoint whose connection cannot be created is marked offline as a
    /// failed probe and left out of the ranking.
    pub fn ranked_providers(&self) -> Vec<RankedProvider> {
        let mut scored = score_all(self.registry.online(), &self.weights);
        // `sort_by` is stable: ties keep registry order.
        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut ranked = Vec::with_capacity(scored.len());
        for entry in scored {
            let url = entry.record.url;
            match self.connection(&url) {
                Ok(transport) => ranked.push(RankedProvider {
                    score: entry.score,
                    latency_ms: entry.record.latency_ms,
                    transport,
                    url,
                }),
                Err(e) => {
                    tracing::warn!(url = %url, error = %e, "connection failed, marking offline");
                    self.registry.record_probe_failure(&url, &e.to_string(), None);
                }
            }
        }
        ranked
    }

    /// The single best provider, or `None` when nothing is online.
    pub fn best_provider(&self) -> Option<RankedProvider> {
        self.ranked_providers().into_iter().next()
    }

    /// Drop the cached connection for `url`. Returns whether one existed.
    pub fn remove_connection(&self, url: &str) -> bool {
        self.cache().remove(url).is_some()
    }

    /// Number of live cached connections.
    pub fn connection_count(&self) -> usize {
        self.cache().len()
    }
}

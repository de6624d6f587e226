//! Endpoint registry — the configured endpoint list plus mutable health state.
//!
//! Records are replaced whole: every mutation clones the current record,
//! edits the clone and swaps it in under the write lock, so readers never
//! observe a half-updated record. Records are never removed.

use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use chrono::{DateTime, Utc};
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::transport::EndpointStatus;

/// Health history of a single endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EndpointRecord {
    pub url: String,
    pub status: EndpointStatus,
    pub last_checked_at: Option<DateTime<Utc>>,
    /// Latency of the last verified probe.
    pub latency_ms: Option<u64>,
    pub success_count: u64,
    pub failure_count: u64,
    /// Failures since the last success.
    pub consecutive_failures: u32,
    pub last_error: Option<String>,
    /// Chain id verified by the last successful probe (or reported by a wrong-network endpoint).
    pub chain_id: Option<u64>,
    /// Head observed by the last successful probe.
    pub block_number: Option<u64>,
}

impl EndpointRecord {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            status: EndpointStatus::Unknown,
            last_checked_at: None,
            latency_ms: None,
            success_count: 0,
            failure_count: 0,
            consecutive_failures: 0,
            last_error: None,
            chain_id: None,
            block_number: None,
        }
    }

    pub fn is_online(&self) -> bool {
        self.status == EndpointStatus::Online
    }

    /// `success / (success + failure)` in `[0, 1]`; zero without history.
    pub fn success_rate(&self) -> f64 {
        let total = self.success_count + self.failure_count;
        if total == 0 {
            return 0.0;
        }
        (self.success_count as f64 / total as f64).clamp(0.0, 1.0)
    }
}

/// Ordered set of endpoint records keyed by URL.
///
/// Iteration order is configuration order; ranking ties fall back to it.
#[derive(Debug, Default)]
pub struct EndpointRegistry {
    records: RwLock<IndexMap<String, EndpointRecord>>,
}

impl EndpointRegistry {
    /// Build a registry from endpoint URLs. Duplicates keep their first position.
    pub fn new<I, S>(urls: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut records = IndexMap::new();
        for url in urls {
            let url = url.into();
            let trimmed = url.trim();
            if trimmed.is_empty() || records.contains_key(trimmed) {
                continue;
            }
            records.insert(trimmed.to_string(), EndpointRecord::new(trimmed));
        }
        Self {
            records: RwLock::new(records),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, IndexMap<String, EndpointRecord>> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, IndexMap<String, EndpointRecord>> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.read().is_empty()
    }

    /// Endpoint URLs in registry order.
    pub fn urls(&self) -> Vec<String> {
        self.read().keys().cloned().collect()
    }

    pub fn get(&self, url: &str) -> Option<EndpointRecord> {
        self.read().get(url).cloned()
    }

    /// Copy of every record, in registry order.
    pub fn records(&self) -> Vec<EndpointRecord> {
        self.read().values().cloned().collect()
    }

    /// Copy of the online records, in registry order.
    pub fn online(&self) -> Vec<EndpointRecord> {
        self.read().values().filter(|r| r.is_online()).cloned().collect()
    }

    /// Apply `edit` to a copy of the record for `url` and swap the copy in.
    /// Returns the new record, or `None` for an unknown URL.
    pub fn replace<F>(&self, url: &str, edit: F) -> Option<EndpointRecord>
    where
        F: FnOnce(&mut EndpointRecord),
    {
        let mut records = self.write();
        let slot = records.get_mut(url)?;
        let mut next = slot.clone();
        edit(&mut next);
        *slot = next.clone();
        Some(next)
    }

    /// A probe verified the endpoint.
    pub fn record_probe_success(
        &self,
        url: &str,
        latency_ms: u64,
        chain_id: u64,
        block_number: u64,
    ) -> Option<EndpointRecord> {
        self.replace(url, |r| {
            r.status = EndpointStatus::Online;
            r.last_checked_at = Some(Utc::now());
            r.latency_ms = Some(latency_ms);
            r.success_count += 1;
            r.consecutive_failures = 0;
            r.last_error = None;
            r.chain_id = Some(chain_id);
            r.block_number = Some(block_number);
        })
    }

    /// A probe round exhausted its retries, or a connection could not be opened.
    pub fn record_probe_failure(
        &self,
        url: &str,
        error: &str,
        observed_chain_id: Option<u64>,
    ) -> Option<EndpointRecord> {
        self.replace(url, |r| {
            r.status = EndpointStatus::Offline;
            r.last_checked_at = Some(Utc::now());
            r.latency_ms = None;
            r.failure_count += 1;
            r.consecutive_failures = r.consecutive_failures.saturating_add(1);
            r.last_error = Some(error.to_string());
            if observed_chain_id.is_some() {
                r.chain_id = observed_chain_id;
            }
        })
    }

    /// A resilient call through this endpoint succeeded.
    pub fn record_call_success(&self, url: &str) -> Option<EndpointRecord> {
        self.replace(url, |r| {
            r.success_count += 1;
            r.consecutive_failures = 0;
        })
    }

    /// A resilient call through this endpoint failed transiently.
    ///
    /// The endpoint is taken offline once its failure streak reaches
    /// `offline_after` (0 disables that); the next probe round can bring it back.
    pub fn record_call_failure(
        &self,
        url: &str,
        error: &str,
        offline_after: u32,
    ) -> Option<EndpointRecord> {
        self.replace(url, |r| {
            r.failure_count += 1;
            r.consecutive_failures = r.consecutive_failures.saturating_add(1);
            r.last_error = Some(error.to_string());
            if offline_after > 0 && r.consecutive_failures >= offline_after {
                r.status = EndpointStatus::Offline;
                r.latency_ms = None;
            }
        })
    }

    /// Administrative reset of the success/failure history of one endpoint.
    pub fn reset_counters(&self, url: &str) -> bool {
        self.replace(url, |r| {
            r.success_count = 0;
            r.failure_count = 0;
            r.consecutive_failures = 0;
        })
        .is_some()
    }
}

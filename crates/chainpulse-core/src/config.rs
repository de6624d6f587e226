//! Connector configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::prober::ProbeConfig;
use crate::resilient::CallPolicy;
use crate::scorer::ScoringWeights;

/// Public BSC mainnet endpoints, in preference order.
pub const DEFAULT_BSC_ENDPOINTS: &[&str] = &[
    "https://bsc-dataseed.binance.org",
    "https://bsc-dataseed1.binance.org",
    "https://bsc-dataseed2.binance.org",
    "https://bsc-dataseed3.binance.org",
    "https://bsc-dataseed4.binance.org",
    "https://bsc-dataseed1.defibit.io",
    "https://bsc-dataseed2.defibit.io",
    "https://bsc-dataseed1.ninicoin.io",
    "https://bsc-dataseed2.ninicoin.io",
    "https://rpc.ankr.com/bsc",
];

/// BSC mainnet chain id.
pub const BSC_CHAIN_ID: u64 = 56;

/// Everything a [`ChainConnector`](crate::ChainConnector) needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectorConfig {
    /// Candidate endpoint URLs; order is the ranking tie-break.
    pub endpoints: Vec<String>,
    pub probe: ProbeConfig,
    pub weights: ScoringWeights,
    /// Default policy for resilient calls.
    pub call: CallPolicy,
    /// Consecutive transient call failures that take an endpoint offline (0 = never).
    pub offline_after_failures: u32,
    /// Per-request timeout handed to the transport factory.
    #[serde(with = "duration_ms")]
    pub request_timeout: Duration,
    /// Background re-probe period; `None` disables the loop.
    #[serde(with = "duration_ms::option")]
    pub probe_interval: Option<Duration>,
}

impl Default for ConnectorConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_BSC_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            probe: ProbeConfig::default(),
            weights: ScoringWeights::default(),
            call: CallPolicy::default(),
            offline_after_failures: 3,
            request_timeout: Duration::from_secs(30),
            probe_interval: None,
        }
    }
}

impl ConnectorConfig {
    /// Same defaults with a custom endpoint list.
    pub fn with_endpoints<I, S>(endpoints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            endpoints: endpoints.into_iter().map(Into::into).collect(),
            ..Default::default()
        }
    }

    pub fn expected_chain_id(&self) -> u64 {
        self.probe.expected_chain_id
    }
}

/// Serde helpers: durations as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(d.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        u64::deserialize(d).map(Duration::from_millis)
    }

    pub mod option {
        use std::time::Duration;

        use serde::{Deserialize, Deserializer, Serializer};

        pub fn serialize<S: Serializer>(d: &Option<Duration>, s: S) -> Result<S::Ok, S::Error> {
            match d {
                Some(d) => s.serialize_some(&(d.as_millis() as u64)),
                None => s.serialize_none(),
            }
        }

        pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
            Option::<u64>::deserialize(d).map(|ms| ms.map(Duration::from_millis))
        }
    }
}

//! Application configuration: one YAML file plus environment overrides.

use std::path::Path;

use anyhow::{bail, Context};
use serde::{Deserialize, Serialize};

use chainpulse_core::ConnectorConfig;
use chainpulse_http::PriceFeedConfig;
use chainpulse_pools::PoolsConfig;

use crate::logging::LogConfig;

/// Comma-separated endpoint list replacing `connector.endpoints`.
pub const ENV_RPC_URLS: &str = "CHAINPULSE_RPC_URLS";
/// Log level replacing `log.level`.
pub const ENV_LOG: &str = "CHAINPULSE_LOG";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub connector: ConnectorConfig,
    pub pools: PoolsConfig,
    pub prices: PriceFeedConfig,
    pub log: LogConfig,
}

impl AppConfig {
    /// Defaults, overlaid with `path` if given, then with the environment.
    pub fn load(path: Option<&Path>) -> anyhow::Result<Self> {
        let mut config = match path {
            Some(path) => {
                let raw = std::fs::read_to_string(path)
                    .with_context(|| format!("reading config file {}", path.display()))?;
                Self::from_yaml(&raw).with_context(|| format!("parsing {}", path.display()))?
            }
            None => Self::default(),
        };
        config.apply_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    pub fn from_yaml(raw: &str) -> anyhow::Result<Self> {
        if raw.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(raw)?)
    }

    pub fn apply_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(urls) = lookup(ENV_RPC_URLS) {
            let urls: Vec<String> = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(String::from)
                .collect();
            if !urls.is_empty() {
                self.connector.endpoints = urls;
            }
        }
        if let Some(level) = lookup(ENV_LOG) {
            if !level.trim().is_empty() {
                self.log.level = level.trim().to_string();
            }
        }
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.connector.endpoints.is_empty() {
            bail!("no RPC endpoints configured (set connector.endpoints or {ENV_RPC_URLS})");
        }
        let attempt = self.connector.call.attempt_timeout;
        if attempt.is_zero() || attempt >= self.pools.timeout {
            bail!(
                "connector.call.attempt_timeout ({}ms) must be positive and below pools.timeout ({}ms)",
                attempt.as_millis(),
                self.pools.timeout.as_millis()
            );
        }
        self.pools.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chainpulse_core::ReferenceAsset;
    use std::collections::HashMap;
    use std::time::Duration;

    #[test]
    fn empty_file_is_all_defaults() {
        let cfg = AppConfig::from_yaml("").unwrap();
        assert_eq!(cfg, AppConfig::default());
        assert_eq!(cfg.connector.expected_chain_id(), 56);
    }

    #[test]
    fn yaml_overrides_selected_fields() {
        let cfg = AppConfig::from_yaml(
            r#"
connector:
  endpoints:
    - https://rpc-a.test
    - https://rpc-b.test
  probe:
    retries_per_endpoint: 2
  call:
    max_retries: 4
    base_delay: 250
pools:
  timeout: 5000
  fallback_prices:
    bnb: 600.0
    eth: 3000.0
prices:
  base_url: https://prices.test/api/v3
log:
  level: debug
  json: true
"#,
        )
        .unwrap();
        assert_eq!(cfg.connector.endpoints.len(), 2);
        assert_eq!(cfg.connector.probe.retries_per_endpoint, 2);
        assert_eq!(cfg.connector.probe.attempt_timeout, Duration::from_secs(10));
        assert_eq!(cfg.connector.call.max_retries, 4);
        assert_eq!(cfg.connector.call.base_delay, Duration::from_millis(250));
        assert_eq!(cfg.connector.call.attempt_timeout, Duration::from_secs(4));
        assert_eq!(cfg.pools.timeout, Duration::from_secs(5));
        assert_eq!(cfg.pools.pools.len(), 2);
        assert_eq!(cfg.pools.fallback_prices.get(ReferenceAsset::Eth), Some(3000.0));
        assert_eq!(cfg.prices.base_url, "https://prices.test/api/v3");
        assert!(cfg.log.json);
    }

    #[test]
    fn example_file_parses() {
        let cfg = AppConfig::from_yaml(include_str!("../../chainpulse.example.yaml")).unwrap();
        cfg.validate().unwrap();
        assert_eq!(cfg.connector.endpoints.len(), 3);
        assert_eq!(cfg.pools, chainpulse_pools::PoolsConfig::default());
        assert_eq!(cfg.log.components["chainpulse-pools"], "debug");
    }

    #[test]
    fn unknown_paired_asset_is_an_error() {
        let err = AppConfig::from_yaml(
            r#"
pools:
  pools:
    - name: X/SOL
      pair_address: "0x4dfb9909a36580e8e6f126acf189a965740f7b35"
      paired_asset: sol
"#,
        );
        assert!(err.is_err());
    }

    #[test]
    fn environment_wins() {
        let env: HashMap<&str, &str> = HashMap::from([
            (ENV_RPC_URLS, " https://a.test, ,https://b.test "),
            (ENV_LOG, "trace"),
        ]);
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| env.get(k).map(|v| v.to_string()));
        assert_eq!(cfg.connector.endpoints, vec!["https://a.test", "https://b.test"]);
        assert_eq!(cfg.log.level, "trace");
    }

    #[test]
    fn blank_environment_is_ignored() {
        let mut cfg = AppConfig::default();
        cfg.apply_overrides(|k| (k == ENV_RPC_URLS).then(|| " , ".to_string()));
        assert_eq!(cfg.connector.endpoints.len(), chainpulse_core::DEFAULT_BSC_ENDPOINTS.len());
    }

    #[test]
    fn attempt_timeout_must_fit_the_aggregation_deadline() {
        let cfg = AppConfig::from_yaml(
            r#"
connector:
  call:
    attempt_timeout: 10000
pools:
  timeout: 10000
"#,
        )
        .unwrap();
        let err = cfg.validate().unwrap_err();
        assert!(err.to_string().contains("attempt_timeout"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = AppConfig::load(Some(Path::new("/nonexistent/chainpulse.yaml"))).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/chainpulse.yaml"));
    }
}

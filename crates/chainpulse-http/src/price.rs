//! CoinGecko-style `simple/price` client implementing [`PriceFeed`].

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use chainpulse_core::config::duration_ms;
use chainpulse_core::price::{PriceError, PriceFeed, ReferenceAsset, ReferencePrices};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceFeedConfig {
    /// API root, without the trailing `/simple/price`.
    pub base_url: String,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
}

impl Default for PriceFeedConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".into(),
            timeout: Duration::from_secs(10),
        }
    }
}

pub struct CoinGeckoFeed {
    http: reqwest::Client,
    config: PriceFeedConfig,
}

impl CoinGeckoFeed {
    pub fn new(config: PriceFeedConfig) -> Result<Self, PriceError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| PriceError::Request(e.to_string()))?;
        Ok(Self { http, config })
    }

    fn endpoint(&self, assets: &[ReferenceAsset]) -> String {
        let ids: Vec<&str> = assets.iter().map(|a| a.coingecko_id()).collect();
        format!(
            "{}/simple/price?ids={}&vs_currencies=usd",
            self.config.base_url.trim_end_matches('/'),
            ids.join(",")
        )
    }
}

#[async_trait]
impl PriceFeed for CoinGeckoFeed {
    async fn quote(&self, assets: &[ReferenceAsset]) -> Result<ReferencePrices, PriceError> {
        if assets.is_empty() {
            return Ok(ReferencePrices::new());
        }
        let url = self.endpoint(assets);
        tracing::debug!(url = %url, "fetching reference prices");

        let resp = self.http.get(&url).send().await.map_err(|e| {
            if e.is_timeout() {
                PriceError::Timeout {
                    ms: self.config.timeout.as_millis() as u64,
                }
            } else {
                PriceError::Request(e.to_string())
            }
        })?;
        if !resp.status().is_success() {
            return Err(PriceError::Status {
                status: resp.status().as_u16(),
            });
        }
        let body = resp
            .bytes()
            .await
            .map_err(|e| PriceError::Request(e.to_string()))?;
        parse_simple_price(&body, assets)
    }

    fn name(&self) -> &str {
        "coingecko"
    }
}

/// `{"ethereum":{"usd":2648.49},"binancecoin":{"usd":677.9}}`
pub fn parse_simple_price(
    body: &[u8],
    assets: &[ReferenceAsset],
) -> Result<ReferencePrices, PriceError> {
    let parsed: HashMap<String, HashMap<String, f64>> =
        serde_json::from_slice(body).map_err(|e| PriceError::Malformed(e.to_string()))?;
    Ok(assets
        .iter()
        .filter_map(|asset| {
            let usd = parsed.get(asset.coingecko_id())?.get("usd")?;
            Some((*asset, *usd))
        })
        .collect())
}

//! Reference asset quotes — the `PriceFeed` seam.
//!
//! Pool valuations need the USD price of each pool's paired asset. Feeds are
//! off-chain services and fail independently of the RPC endpoints; callers
//! substitute configured fallbacks when a quote is missing.

use std::collections::BTreeMap;
use std::fmt;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// External asset whose USD quote values a pool's paired reserve.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ReferenceAsset {
    Bnb,
    Eth,
}

impl ReferenceAsset {
    pub const ALL: [ReferenceAsset; 2] = [ReferenceAsset::Bnb, ReferenceAsset::Eth];

    /// Identifier used by CoinGecko-style price APIs.
    pub fn coingecko_id(self) -> &'static str {
        match self {
            Self::Bnb => "binancecoin",
            Self::Eth => "ethereum",
        }
    }

    pub fn symbol(self) -> &'static str {
        match self {
            Self::Bnb => "BNB",
            Self::Eth => "ETH",
        }
    }
}

impl fmt::Display for ReferenceAsset {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// USD quotes keyed by asset. An asset may be absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ReferencePrices(BTreeMap<ReferenceAsset, f64>);

impl ReferencePrices {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a quote; non-finite or non-positive values are ignored.
    pub fn with(mut self, asset: ReferenceAsset, usd: f64) -> Self {
        self.insert(asset, usd);
        self
    }

    pub fn insert(&mut self, asset: ReferenceAsset, usd: f64) {
        if usd.is_finite() && usd > 0.0 {
            self.0.insert(asset, usd);
        }
    }

    pub fn get(&self, asset: ReferenceAsset) -> Option<f64> {
        self.0.get(&asset).copied()
    }

    pub fn contains(&self, asset: ReferenceAsset) -> bool {
        self.0.contains_key(&asset)
    }
}

impl FromIterator<(ReferenceAsset, f64)> for ReferencePrices {
    fn from_iter<I: IntoIterator<Item = (ReferenceAsset, f64)>>(iter: I) -> Self {
        let mut prices = Self::new();
        for (asset, usd) in iter {
            prices.insert(asset, usd);
        }
        prices
    }
}

#[derive(Debug, thiserror::Error)]
pub enum PriceError {
    #[error("price request failed: {0}")]
    Request(String),

    #[error("price service returned HTTP {status}")]
    Status { status: u16 },

    #[error("price request timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("malformed price response: {0}")]
    Malformed(String),
}

/// Source of USD quotes for reference assets.
#[async_trait]
pub trait PriceFeed: Send + Sync + 'static {
    /// Quote `assets` in USD. Assets the service does not know are omitted
    /// from the result rather than failing the whole request.
    async fn quote(&self, assets: &[ReferenceAsset]) -> Result<ReferencePrices, PriceError>;

    /// Short name for logs.
    fn name(&self) -> &str;
}

/// A feed that always answers with the same quotes. Useful offline.
#[derive(Debug, Clone, Default)]
pub struct StaticPriceFeed {
    prices: ReferencePrices,
}

impl StaticPriceFeed {
    pub fn new(prices: ReferencePrices) -> Self {
        Self { prices }
    }
}

#[async_trait]
impl PriceFeed for StaticPriceFeed {
    async fn quote(&self, assets: &[ReferenceAsset]) -> Result<ReferencePrices, PriceError> {
        Ok(assets
            .iter()
            .filter_map(|a| self.prices.get(*a).map(|p| (*a, p)))
            .collect())
    }

    fn name(&self) -> &str {
        "static"
    }
}

//! Pools configuration. Defaults describe the SWF pools on BSC.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use chainpulse_core::config::duration_ms;
use chainpulse_core::price::{ReferenceAsset, ReferencePrices};

use crate::abi::Address;
use crate::error::AggregationError;

pub const SWF_TOKEN: &str = "0x7e243288B287BEe84A7D40E8520444f47af88335";
pub const SWF_BNB_PAIR: &str = "0x4dfb9909a36580e8e6f126acf189a965740f7b35";
pub const SWF_ETH_PAIR: &str = "0x5Ac30825dA8fCEEFCC8AC1e29df82eC866050e94";

/// One pair contract holding the asset of interest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolConfig {
    pub name: String,
    pub pair_address: Address,
    /// Reference asset whose USD quote values the non-asset side.
    pub paired_asset: ReferenceAsset,
    /// Decimals of both pooled tokens.
    #[serde(default = "default_decimals")]
    pub decimals: u8,
}

fn default_decimals() -> u8 {
    18
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolsConfig {
    /// Token whose reserves are aggregated.
    pub asset_address: Address,
    pub asset_symbol: String,
    pub pools: Vec<PoolConfig>,
    /// Quotes used when the price feed fails or omits an asset.
    pub fallback_prices: ReferencePrices,
    #[serde(with = "duration_ms")]
    pub timeout: Duration,
    pub retries: u32,
}

impl Default for PoolsConfig {
    fn default() -> Self {
        Self {
            asset_address: parse_const(SWF_TOKEN),
            asset_symbol: "SWF".into(),
            pools: vec![
                PoolConfig {
                    name: "SWF/BNB".into(),
                    pair_address: parse_const(SWF_BNB_PAIR),
                    paired_asset: ReferenceAsset::Bnb,
                    decimals: 18,
                },
                PoolConfig {
                    name: "SWF/ETH".into(),
                    pair_address: parse_const(SWF_ETH_PAIR),
                    paired_asset: ReferenceAsset::Eth,
                    decimals: 18,
                },
            ],
            fallback_prices: ReferencePrices::new()
                .with(ReferenceAsset::Eth, 2648.49)
                .with(ReferenceAsset::Bnb, 677.9),
            timeout: Duration::from_secs(10),
            retries: 3,
        }
    }
}

impl PoolsConfig {
    pub fn validate(&self) -> Result<(), AggregationError> {
        if self.pools.is_empty() {
            return Err(AggregationError::NoPoolsConfigured);
        }
        Ok(())
    }

    /// Distinct reference assets the configured pools need, in pool order.
    pub fn paired_assets(&self) -> Vec<ReferenceAsset> {
        let mut assets = Vec::new();
        for pool in &self.pools {
            if !assets.contains(&pool.paired_asset) {
                assets.push(pool.paired_asset);
            }
        }
        assets
    }
}

fn parse_const(s: &str) -> Address {
    s.parse().unwrap_or(Address::ZERO)
}

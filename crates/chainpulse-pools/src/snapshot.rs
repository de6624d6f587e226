//! Immutable aggregation results.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use chainpulse_core::price::{ReferenceAsset, ReferencePrices};

use crate::abi::{to_units, Address};
use crate::config::PoolsConfig;
use crate::error::AggregationError;
use crate::pair::PairState;

/// Token decimals beyond this are treated as garbage.
pub const MAX_DECIMALS: u8 = 36;

/// Where the reference prices of a snapshot came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriceSource {
    /// Every price came from the feed.
    Live,
    /// At least one configured fallback price was substituted.
    Fallback,
}

/// One pool as seen by one aggregation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolReading {
    pub name: String,
    pub pair_address: Address,
    pub token0: Address,
    pub token1: Address,
    pub asset_is_token0: bool,
    pub asset_reserve: f64,
    pub paired_reserve: f64,
    pub paired_asset: ReferenceAsset,
    pub lp_total_supply: f64,
    /// Paired asset per unit of the asset.
    pub implied_price: Option<f64>,
    pub paired_price_usd: Option<f64>,
    /// USD value of the paired reserve, the pool's displayed TVL.
    pub paired_value_usd: Option<f64>,
    pub asset_price_usd: Option<f64>,
}

impl PoolReading {
    /// Both sides of the pool in USD.
    pub fn pool_value_usd(&self) -> Option<f64> {
        self.paired_value_usd.map(|v| v * 2.0)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PoolSnapshot {
    pub asset: Address,
    pub asset_symbol: String,
    pub pools: Vec<PoolReading>,
    pub total_asset_reserve: f64,
    /// Sum of per-pool paired reserve values.
    pub combined_tvl_usd: Option<f64>,
    /// Units of the first pool's paired asset per unit of the second's, as
    /// implied by the two pools. Only defined for exactly two pools.
    pub cross_price: Option<f64>,
    pub prices: ReferencePrices,
    pub price_source: PriceSource,
    pub timestamp: DateTime<Utc>,
}

impl PoolSnapshot {
    pub fn pool(&self, name: &str) -> Option<&PoolReading> {
        self.pools.iter().find(|p| p.name == name)
    }

    pub fn pool_by_address(&self, address: &Address) -> Option<&PoolReading> {
        self.pools.iter().find(|p| p.pair_address == *address)
    }
}

/// `numerator / denominator`, or `None` when the ratio is meaningless.
pub fn plausible_ratio(numerator: f64, denominator: f64) -> Option<f64> {
    let ratio = numerator / denominator;
    (denominator > 0.0 && ratio.is_finite() && ratio > 0.0).then_some(ratio)
}

/// Merge one state per configured pool (same order) into a snapshot.
pub fn build_snapshot(
    config: &PoolsConfig,
    states: &[PairState],
    prices: ReferencePrices,
    price_source: PriceSource,
) -> Result<PoolSnapshot, AggregationError> {
    let mut pools = Vec::with_capacity(states.len());
    for (pool, state) in config.pools.iter().zip(states) {
        let oriented = state
            .orient(&config.asset_address)
            .ok_or_else(|| AggregationError::AssetNotInPool {
                pool: pool.name.clone(),
                asset: config.asset_address,
                token0: state.token0,
                token1: state.token1,
            })?;
        if state.decimals > MAX_DECIMALS || pool.decimals > MAX_DECIMALS {
            return Err(AggregationError::Decode {
                pool: pool.name.clone(),
                reason: format!("{} decimals", state.decimals.max(pool.decimals)),
            });
        }

        let asset_reserve = to_units(oriented.asset_reserve, pool.decimals);
        let paired_reserve = to_units(oriented.paired_reserve, pool.decimals);
        let implied_price = plausible_ratio(paired_reserve, asset_reserve);
        let paired_price_usd = prices.get(pool.paired_asset);
        pools.push(PoolReading {
            name: pool.name.clone(),
            pair_address: state.address,
            token0: state.token0,
            token1: state.token1,
            asset_is_token0: oriented.asset_is_token0,
            asset_reserve,
            paired_reserve,
            paired_asset: pool.paired_asset,
            lp_total_supply: to_units(state.total_supply, state.decimals),
            implied_price,
            paired_price_usd,
            paired_value_usd: paired_price_usd.map(|p| paired_reserve * p),
            asset_price_usd: implied_price.zip(paired_price_usd).map(|(i, p)| i * p),
        });
    }

    let total_asset_reserve = pools.iter().map(|p| p.asset_reserve).sum();
    let combined_tvl_usd = pools
        .iter()
        .map(|p| p.paired_value_usd)
        .sum::<Option<f64>>();
    let cross_price = match pools.as_slice() {
        [a, b] => a
            .implied_price
            .zip(b.implied_price)
            .and_then(|(pa, pb)| plausible_ratio(pa, pb)),
        _ => None,
    };

    Ok(PoolSnapshot {
        asset: config.asset_address,
        asset_symbol: config.asset_symbol.clone(),
        pools,
        total_asset_reserve,
        combined_tvl_usd,
        cross_price,
        prices,
        price_source,
        timestamp: Utc::now(),
    })
}

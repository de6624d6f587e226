//! Wallet LP positions valued against a snapshot.

use serde::{Deserialize, Serialize};

use crate::abi::{to_f64, to_units, Address};
use crate::config::PoolConfig;
use crate::error::AggregationError;
use crate::pair::LpHolding;
use crate::snapshot::{PoolSnapshot, MAX_DECIMALS};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LpPosition {
    pub pool: String,
    pub pair_address: Address,
    /// LP tokens held, scaled by the LP token decimals.
    pub tokens: f64,
    /// Fraction of the LP supply held, in `[0, 1]`.
    pub share: f64,
    /// `None` when no snapshot or price was available.
    pub value_usd: Option<f64>,
}

/// Value one holding. The position is worth its share of both pool sides.
pub fn lp_position(
    pool: &PoolConfig,
    holding: &LpHolding,
    snapshot: Option<&PoolSnapshot>,
) -> Result<LpPosition, AggregationError> {
    if holding.decimals > MAX_DECIMALS {
        return Err(AggregationError::Decode {
            pool: pool.name.clone(),
            reason: format!("{} LP decimals", holding.decimals),
        });
    }
    let share = if holding.total_supply.is_zero() {
        0.0
    } else {
        (to_f64(holding.balance) / to_f64(holding.total_supply)).clamp(0.0, 1.0)
    };
    let value_usd = snapshot
        .and_then(|s| s.pool_by_address(&pool.pair_address))
        .and_then(|reading| reading.pool_value_usd())
        .map(|pool_value| pool_value * share);

    Ok(LpPosition {
        pool: pool.name.clone(),
        pair_address: pool.pair_address,
        tokens: to_units(holding.balance, holding.decimals),
        share,
        value_usd,
    })
}

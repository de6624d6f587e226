//! chainpulse-pools — paired liquidity reserves read through the resilient caller.
//!
//! [`PoolAggregator`] reads every configured Uniswap-V2 style pair concurrently
//! and merges them into one immutable [`PoolSnapshot`]: reserves oriented
//! around the asset of interest, implied prices and USD valuations. Reference
//! prices come from a [`PriceFeed`](chainpulse_core::PriceFeed); configured
//! fallbacks fill any gap and the snapshot says so via [`PriceSource`].

pub mod abi;
pub mod aggregator;
pub mod config;
pub mod error;
pub mod pair;
pub mod position;
pub mod snapshot;

pub use abi::Address;
pub use aggregator::PoolAggregator;
pub use config::{PoolConfig, PoolsConfig};
pub use error::AggregationError;
pub use pair::{LpHolding, PairState};
pub use position::LpPosition;
pub use snapshot::{PoolReading, PoolSnapshot, PriceSource};

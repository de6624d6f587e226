//! Error types for pool aggregation.

use thiserror::Error;

use chainpulse_core::error::CallError;

use crate::abi::Address;

#[derive(Debug, Error)]
pub enum AggregationError {
    #[error("pool aggregation timed out after {ms}ms")]
    Timeout { ms: u64 },

    #[error("reading pool {pool} failed: {source}")]
    Failed {
        pool: String,
        #[source]
        source: CallError,
    },

    #[error("pool {pool} holds {token0} and {token1}, not {asset}")]
    AssetNotInPool {
        pool: String,
        asset: Address,
        token0: Address,
        token1: Address,
    },

    #[error("pool {pool} returned unusable data: {reason}")]
    Decode { pool: String, reason: String },

    #[error("invalid address `{0}`")]
    InvalidAddress(String),

    #[error("no pools configured")]
    NoPoolsConfigured,
}

impl AggregationError {
    /// Name of the pool the error is about, if any.
    pub fn pool(&self) -> Option<&str> {
        match self {
            Self::Failed { pool, .. }
            | Self::AssetNotInPool { pool, .. }
            | Self::Decode { pool, .. } => Some(pool),
            _ => None,
        }
    }
}

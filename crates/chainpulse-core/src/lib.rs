//! chainpulse-core — endpoint health, ranking and resilient reads for ChainPulse.
//!
//! # Overview
//!
//! Many public JSON-RPC endpoints serve the same chain with very different
//! availability. This crate keeps track of them and hides their failures:
//!
//! - [`RpcTransport`] — the async trait every transport implements
//! - [`EndpointRegistry`] — per-endpoint health records
//! - [`HealthProber`] — concurrent height + chain id verification
//! - [`scorer`] — reliability score from latency and success rate
//! - [`ProviderPool`] — score-ranked online endpoints with a connection cache
//! - [`ResilientCaller`] — retry, backoff and rotation for any remote read
//! - [`PriceFeed`] — the seam for reference asset quotes
//! - [`ChainConnector`] — one explicit instance wiring all of the above

pub mod config;
pub mod connector;
pub mod error;
pub mod policy;
pub mod pool;
pub mod price;
pub mod prober;
pub mod registry;
pub mod request;
pub mod resilient;
pub mod scorer;
pub mod transport;

#[cfg(test)]
mod mock;

pub use config::{ConnectorConfig, BSC_CHAIN_ID, DEFAULT_BSC_ENDPOINTS};
pub use connector::{ChainConnector, ConnectionStatus};
pub use error::{CallError, FailureClass, ProbeError, TransportError};
pub use pool::{ProviderPool, RankedProvider};
pub use price::{PriceError, PriceFeed, ReferenceAsset, ReferencePrices, StaticPriceFeed};
pub use prober::{HealthProber, ProbeConfig, ProbeResult, ProbeSuccess};
pub use registry::{EndpointRecord, EndpointRegistry};
pub use request::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, RpcId};
pub use resilient::{CallPolicy, ResilientCaller};
pub use scorer::{ScoredEndpoint, ScoringWeights};
pub use transport::{EndpointStatus, RpcTransport, RpcTransportExt, TransportFactory};

//! chainpulse-http — `reqwest`-backed transports for ChainPulse.
//!
//! - [`HttpRpcClient`] — single-shot JSON-RPC over HTTP(S)
//! - [`HttpTransportFactory`] — opens clients sharing one connection pool
//! - [`CoinGeckoFeed`] — reference prices from a `simple/price` API

pub mod client;
pub mod price;

pub use client::{HttpClientConfig, HttpRpcClient, HttpTransportFactory};
pub use price::{CoinGeckoFeed, PriceFeedConfig};

//! Pool data aggregator — concurrent resilient pair reads merged into one snapshot.

use std::sync::Arc;
use std::time::Duration;

use futures::future::try_join_all;
use tokio::time::Instant;

use chainpulse_core::connector::ChainConnector;
use chainpulse_core::price::{PriceFeed, ReferencePrices};
use chainpulse_core::resilient::CallPolicy;

use crate::abi::Address;
use crate::config::{PoolConfig, PoolsConfig};
use crate::error::AggregationError;
use crate::pair::{read_holding, read_pair, LpHolding, PairState};
use crate::position::{lp_position, LpPosition};
use crate::snapshot::{build_snapshot, PoolSnapshot, PriceSource};

pub struct PoolAggregator {
    connector: Arc<ChainConnector>,
    prices: Arc<dyn PriceFeed>,
    config: PoolsConfig,
}

impl PoolAggregator {
    pub fn new(
        connector: Arc<ChainConnector>,
        prices: Arc<dyn PriceFeed>,
        config: PoolsConfig,
    ) -> Result<Self, AggregationError> {
        config.validate()?;
        Ok(Self {
            connector,
            prices,
            config,
        })
    }

    pub fn config(&self) -> &PoolsConfig {
        &self.config
    }

    /// Snapshot using the configured timeout and retry budget.
    pub async fn snapshot(&self) -> Result<PoolSnapshot, AggregationError> {
        self.combined_snapshot(self.config.timeout, self.config.retries)
            .await
    }

    /// Read every configured pool concurrently and merge the results.
    ///
    /// Either all pools are read or the whole aggregation fails. Reference
    /// prices are fetched alongside; if they are not available by the time
    /// the reads finish and the deadline passes, fallbacks are used.
    pub async fn combined_snapshot(
        &self,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<PoolSnapshot, AggregationError> {
        let deadline = Instant::now() + timeout;
        let policy = self.policy(max_retries);
        let timed_out = || AggregationError::Timeout {
            ms: timeout.as_millis() as u64,
        };

        let reads = try_join_all(self.config.pools.iter().map(|p| self.read_pool(p, &policy)));
        let quote = self.quote_prices();
        tokio::pin!(reads, quote);

        let mut quoted = None;
        let states = tokio::time::timeout_at(deadline, async {
            loop {
                tokio::select! {
                    states = &mut reads => break states,
                    q = &mut quote, if quoted.is_none() => quoted = Some(q),
                }
            }
        })
        .await
        .map_err(|_| {
            tracing::warn!(timeout_ms = timeout.as_millis() as u64, "pool aggregation timed out");
            timed_out()
        })??;

        let (prices, price_source) = match quoted {
            Some(q) => q,
            None => match tokio::time::timeout_at(deadline, quote).await {
                Ok(q) => q,
                Err(_) => {
                    tracing::warn!(feed = self.prices.name(), "price feed too slow, using fallback prices");
                    (self.config.fallback_prices.clone(), PriceSource::Fallback)
                }
            },
        };

        let snapshot = build_snapshot(&self.config, &states, prices, price_source)?;
        tracing::info!(
            pools = snapshot.pools.len(),
            total_reserve = snapshot.total_asset_reserve,
            price_source = ?snapshot.price_source,
            "pool snapshot assembled"
        );
        Ok(snapshot)
    }

    /// LP positions of `wallet` in every configured pool.
    ///
    /// Balances must be readable; the valuation is best-effort and left empty
    /// when the snapshot cannot be built.
    pub async fn lp_positions(
        &self,
        wallet: &str,
        timeout: Duration,
        max_retries: u32,
    ) -> Result<Vec<LpPosition>, AggregationError> {
        let owner: Address = wallet
            .parse()
            .map_err(|_| AggregationError::InvalidAddress(wallet.to_string()))?;
        let policy = self.policy(max_retries);

        let holdings = try_join_all(
            self.config
                .pools
                .iter()
                .map(|p| self.read_lp_holding(p, owner, &policy)),
        );
        let both = async { tokio::join!(self.combined_snapshot(timeout, max_retries), holdings) };
        let (snapshot, holdings) = tokio::time::timeout(timeout, both).await.map_err(|_| {
            AggregationError::Timeout {
                ms: timeout.as_millis() as u64,
            }
        })?;
        let holdings = holdings?;

        let snapshot = match snapshot {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::warn!(error = %e, "positions without valuation");
                None
            }
        };
        self.config
            .pools
            .iter()
            .zip(&holdings)
            .map(|(pool, holding)| lp_position(pool, holding, snapshot.as_ref()))
            .collect()
    }

    /// The connector's call policy with a per-aggregation attempt budget.
    fn policy(&self, max_retries: u32) -> CallPolicy {
        CallPolicy {
            max_retries,
            ..self.connector.call_policy().clone()
        }
    }

    async fn read_pool(
        &self,
        pool: &PoolConfig,
        policy: &CallPolicy,
    ) -> Result<PairState, AggregationError> {
        let pair = pool.pair_address;
        self.connector
            .caller()
            .call(policy, move |t| async move { read_pair(t.as_ref(), pair).await })
            .await
            .map_err(|source| {
                tracing::error!(pool = %pool.name, error = %source, "pool read failed");
                AggregationError::Failed {
                    pool: pool.name.clone(),
                    source,
                }
            })
    }

    async fn read_lp_holding(
        &self,
        pool: &PoolConfig,
        owner: Address,
        policy: &CallPolicy,
    ) -> Result<LpHolding, AggregationError> {
        let pair = pool.pair_address;
        self.connector
            .caller()
            .call(policy, move |t| async move { read_holding(t.as_ref(), pair, owner).await })
            .await
            .map_err(|source| AggregationError::Failed {
                pool: pool.name.clone(),
                source,
            })
    }

    /// Quotes for every paired asset, with configured fallbacks filling gaps.
    async fn quote_prices(&self) -> (ReferencePrices, PriceSource) {
        let assets = self.config.paired_assets();
        let fallback = &self.config.fallback_prices;
        let live = match self.prices.quote(&assets).await {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(feed = self.prices.name(), error = %e, "price feed failed, using fallback prices");
                return (fallback.clone(), PriceSource::Fallback);
            }
        };

        let mut source = PriceSource::Live;
        let mut prices = ReferencePrices::new();
        for asset in assets {
            match live.get(asset).or_else(|| fallback.get(asset)) {
                Some(usd) => {
                    if !live.contains(asset) {
                        tracing::warn!(%asset, usd, "price missing from feed, using fallback");
                        source = PriceSource::Fallback;
                    }
                    prices.insert(asset, usd);
                }
                None => source = PriceSource::Fallback,
            }
        }
        (prices, source)
    }
}

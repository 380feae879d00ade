//! Portfolio aggregation across a user's addresses.
//!
//! Each lookup kind runs as one batch, so a failing address or protocol
//! shows up as a per-entry error while every other entry is still reported.

use alloy_primitives::U256;
use chrono::{DateTime, Utc};
use portfolio_core::{
    partition_addresses, sats_to_btc, wei_to_eth, AddressKind, Asset, CometPosition,
    EulerPosition, Fiat, PendlePosition, SpotPrices,
};
use portfolio_feeds::{FeedError, FeedResult, PortfolioSource};
use portfolio_rpc::{run_batch, BatchResult};
use std::sync::Arc;
use std::time::Duration;
use tracing::{info, warn};

pub type Lookup<T> = BatchResult<String, T, FeedError>;

/// Everything known about a set of addresses at one point in time.
#[derive(Debug)]
pub struct Portfolio {
    pub btc: Lookup<i64>,
    pub eth: Lookup<U256>,
    pub compound: Lookup<Vec<CometPosition>>,
    pub euler: Lookup<Vec<EulerPosition>>,
    pub pendle: Lookup<PendlePosition>,
    /// Balances are still reported when the price feed fails.
    pub prices: Result<SpotPrices, FeedError>,
    pub generated_at: DateTime<Utc>,
}

impl Portfolio {
    /// Sum of successful BTC lookups in satoshi.
    pub fn total_btc_sats(&self) -> i64 {
        self.btc.successes().map(|(_, sats)| *sats).sum()
    }

    /// Sum of successful ETH lookups in ether.
    pub fn total_eth(&self) -> f64 {
        self.eth.successes().map(|(_, wei)| wei_to_eth(*wei)).sum()
    }

    /// Value of all successful protocol positions in `fiat`.
    pub fn protocols_value(&self, prices: &SpotPrices, fiat: Fiat) -> f64 {
        let compound: f64 = self
            .compound
            .successes()
            .flat_map(|(_, positions)| positions.iter())
            .filter_map(|p| p.value(prices, fiat))
            .sum();
        let euler: f64 = self
            .euler
            .successes()
            .flat_map(|(_, positions)| positions.iter())
            .filter_map(|p| p.value(prices, fiat))
            .sum();
        let pendle: f64 = self
            .pendle
            .successes()
            .filter_map(|(_, p)| p.value(prices, fiat))
            .sum();
        compound + euler + pendle
    }

    /// Portfolio value in `fiat`, or `None` without prices.
    ///
    /// Only successful lookups contribute; failures are listed separately.
    pub fn total(&self, fiat: Fiat) -> Option<f64> {
        let prices = self.prices.as_ref().ok()?;
        let btc = prices.value(Asset::Btc, sats_to_btc(self.total_btc_sats()), fiat);
        let eth = prices.value(Asset::Eth, self.total_eth(), fiat);
        Some(btc + eth + self.protocols_value(prices, fiat))
    }

    pub fn failure_count(&self) -> usize {
        self.btc.failure_count()
            + self.eth.failure_count()
            + self.compound.failure_count()
            + self.euler.failure_count()
            + self.pendle.failure_count()
    }
}

/// Balance of a single address, for `/balance`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum SingleBalance {
    Btc { sats: i64 },
    Eth { wei: U256 },
}

/// Builds portfolios from a [`PortfolioSource`].
#[derive(Clone)]
pub struct PortfolioService {
    source: Arc<dyn PortfolioSource>,
    batch_deadline: Duration,
}

impl PortfolioService {
    pub fn new(source: Arc<dyn PortfolioSource>, batch_deadline: Duration) -> Self {
        Self {
            source,
            batch_deadline,
        }
    }

    async fn lookup<T, F, Fut>(&self, addresses: &[String], per_item: F) -> Lookup<T>
    where
        F: Fn(String) -> Fut,
        Fut: std::future::Future<Output = FeedResult<T>>,
    {
        run_batch(addresses.iter().cloned(), Some(self.batch_deadline), per_item).await
    }

    /// Look up every address concurrently. Never fails as a whole.
    pub async fn build(&self, addresses: &[String]) -> Portfolio {
        let (btc_addrs, eth_addrs) = partition_addresses(addresses);
        let source = &self.source;

        let (btc, eth, compound, euler, pendle, prices) = tokio::join!(
            self.lookup(&btc_addrs, |a| async move { source.btc_balance(&a).await }),
            self.lookup(&eth_addrs, |a| async move { source.eth_balance(&a).await }),
            self.lookup(&eth_addrs, |a| async move { source.compound_positions(&a).await }),
            self.lookup(&eth_addrs, |a| async move { source.euler_positions(&a).await }),
            self.lookup(&eth_addrs, |a| async move { source.pendle_position(&a).await }),
            source.spot_prices(),
        );

        if let Err(e) = &prices {
            warn!("Price feed unavailable: {}", e);
        }

        let portfolio = Portfolio {
            btc,
            eth,
            compound,
            euler,
            pendle,
            prices,
            generated_at: Utc::now(),
        };
        info!(
            "Built portfolio: {} BTC, {} ETH addresses, {} failed lookups",
            btc_addrs.len(),
            eth_addrs.len(),
            portfolio.failure_count()
        );
        portfolio
    }

    /// Native balance of one address.
    pub async fn balance(&self, address: &str) -> FeedResult<SingleBalance> {
        match AddressKind::classify(address) {
            Some(AddressKind::Bitcoin) => Ok(SingleBalance::Btc {
                sats: self.source.btc_balance(address).await?,
            }),
            Some(AddressKind::Ethereum) => Ok(SingleBalance::Eth {
                wei: self.source.eth_balance(address).await?,
            }),
            None => Err(FeedError::InvalidAddress(address.to_string())),
        }
    }

    pub async fn prices(&self) -> FeedResult<SpotPrices> {
        self.source.spot_prices().await
    }
}

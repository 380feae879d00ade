//! The lookups a portfolio report is built from.

use crate::compound::CompoundClient;
use crate::config::{ExplorerConfig, PriceConfig, ProtocolsConfig};
use crate::error::FeedResult;
use crate::euler::EulerClient;
use crate::explorer::EsploraClient;
use crate::http::build_client;
use crate::pendle::PendleClient;
use crate::prices::PriceClient;
use alloy_primitives::U256;
use async_trait::async_trait;
use portfolio_core::{CometPosition, EulerPosition, PendlePosition, SpotPrices};
use portfolio_rpc::{EthClient, RpcManager};
use std::sync::Arc;

/// Per-address lookups used by portfolio aggregation.
#[async_trait]
pub trait PortfolioSource: Send + Sync {
    /// Bitcoin balance in satoshi.
    async fn btc_balance(&self, address: &str) -> FeedResult<i64>;

    /// Ether balance in wei.
    async fn eth_balance(&self, address: &str) -> FeedResult<U256>;

    async fn compound_positions(&self, address: &str) -> FeedResult<Vec<CometPosition>>;

    async fn euler_positions(&self, address: &str) -> FeedResult<Vec<EulerPosition>>;

    async fn pendle_position(&self, address: &str) -> FeedResult<PendlePosition>;

    async fn spot_prices(&self) -> FeedResult<SpotPrices>;
}

/// Live implementation over the explorer, the RPC dispatcher and the REST APIs.
#[derive(Debug)]
pub struct Collaborators {
    explorer: EsploraClient,
    eth: EthClient,
    compound: CompoundClient,
    euler: EulerClient,
    pendle: PendleClient,
    prices: PriceClient,
}

impl Collaborators {
    pub fn new(
        manager: Arc<RpcManager>,
        explorer: &ExplorerConfig,
        prices: &PriceConfig,
        protocols: &ProtocolsConfig,
    ) -> FeedResult<Self> {
        let http = build_client(explorer.timeout())?;
        let eth = EthClient::new(manager)?;

        Ok(Self {
            explorer: EsploraClient::with_client(http.clone(), &explorer.base_url),
            compound: CompoundClient::new(eth.clone(), protocols.compound_markets.clone()),
            euler: EulerClient::new(eth.clone(), protocols.euler_vaults.clone()),
            pendle: PendleClient::new(http.clone(), &protocols.pendle_url),
            prices: PriceClient::new(prices, http),
            eth,
        })
    }

    pub fn eth(&self) -> &EthClient {
        &self.eth
    }

    pub fn compound(&self) -> &CompoundClient {
        &self.compound
    }
}

#[async_trait]
impl PortfolioSource for Collaborators {
    async fn btc_balance(&self, address: &str) -> FeedResult<i64> {
        self.explorer.balance_sats(address).await
    }

    async fn eth_balance(&self, address: &str) -> FeedResult<U256> {
        Ok(self.eth.get_balance(address).await?)
    }

    async fn compound_positions(&self, address: &str) -> FeedResult<Vec<CometPosition>> {
        self.compound.positions(address).await
    }

    async fn euler_positions(&self, address: &str) -> FeedResult<Vec<EulerPosition>> {
        self.euler.positions(address).await
    }

    async fn pendle_position(&self, address: &str) -> FeedResult<PendlePosition> {
        self.pendle.position(address).await
    }

    async fn spot_prices(&self) -> FeedResult<SpotPrices> {
        self.prices.fetch().await
    }
}

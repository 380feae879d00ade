//! Compound v3 (Comet) account positions.
//!
//! Every read is an `eth_call` routed through the dispatcher, so market
//! metadata (base token, scales, asset list) is served from the response
//! cache on repeated lookups within the TTL.

use crate::error::{FeedError, FeedResult};
use alloy_primitives::{Address, U256};
use alloy_sol_types::SolCall;
use compact_str::CompactString;
use futures_util::future::try_join_all;
use portfolio_core::{Collateral, CometPosition, TokenAmount};
use portfolio_rpc::abi::{self, IComet, IERC20};
use portfolio_rpc::EthClient;
use tracing::debug;

#[derive(Debug, Clone)]
pub struct CompoundClient {
    eth: EthClient,
    markets: Vec<String>,
}

fn scaled(raw: U256, scale: u64) -> FeedResult<TokenAmount> {
    TokenAmount::from_scale(raw, scale)
        .ok_or_else(|| FeedError::ParseError(format!("scale {} is not a power of ten", scale)))
}

impl CompoundClient {
    pub fn new(eth: EthClient, markets: Vec<String>) -> Self {
        Self { eth, markets }
    }

    pub fn markets(&self) -> &[String] {
        &self.markets
    }

    /// ERC-20 `symbol()` of `token`.
    pub async fn token_symbol(&self, token: Address) -> FeedResult<CompactString> {
        let data = self
            .eth
            .call_raw(token, IERC20::symbolCall {}.abi_encode())
            .await?;
        Ok(CompactString::from(abi::decode_symbol(&data)?))
    }

    async fn collateral(
        &self,
        market: Address,
        account: Address,
        index: u8,
    ) -> FeedResult<Option<Collateral>> {
        let info = self
            .eth
            .call(market, &IComet::getAssetInfoCall { i: index })
            .await?;

        let balance = self
            .eth
            .call(
                market,
                &IComet::collateralBalanceOfCall {
                    account,
                    asset: info.asset,
                },
            )
            .await?;
        if balance == 0 {
            return Ok(None);
        }

        let symbol = self.token_symbol(info.asset).await?;
        Ok(Some(Collateral {
            symbol,
            amount: scaled(U256::from(balance), info.scale)?,
        }))
    }

    /// Position of `account` in the Comet market at `market`.
    pub async fn position(&self, market: &str, account: &str) -> FeedResult<CometPosition> {
        let market = abi::parse_address(market)?;
        let account = abi::parse_address(account)?;

        let balance_call = IComet::balanceOfCall { account };
        let borrow_call = IComet::borrowBalanceOfCall { account };
        let (base_token, base_scale, supplied, borrowed, num_assets) = tokio::try_join!(
            self.eth.call(market, &IComet::baseTokenCall {}),
            self.eth.call(market, &IComet::baseScaleCall {}),
            self.eth.call(market, &balance_call),
            self.eth.call(market, &borrow_call),
            self.eth.call(market, &IComet::numAssetsCall {}),
        )?;

        let base_symbol = self.token_symbol(base_token).await?;

        let collaterals = try_join_all((0..num_assets).map(|i| self.collateral(market, account, i)))
            .await?
            .into_iter()
            .flatten()
            .collect();

        let position = CometPosition {
            base_symbol,
            supplied: scaled(supplied, base_scale)?,
            borrowed: scaled(borrowed, base_scale)?,
            collaterals,
        };
        debug!(
            "Compound {} for {}: {} supplied, {} borrowed, {} collaterals",
            market,
            account,
            position.supplied,
            position.borrowed,
            position.collaterals.len()
        );
        Ok(position)
    }

    /// Non-empty positions of `account` across all configured markets.
    pub async fn positions(&self, account: &str) -> FeedResult<Vec<CometPosition>> {
        let all = try_join_all(self.markets.iter().map(|m| self.position(m, account))).await?;
        Ok(all.into_iter().filter(|p| !p.is_empty()).collect())
    }
}

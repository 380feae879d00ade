//! Euler vault balances, read through the ERC-4626 share interface.

use crate::config::EulerVault;
use crate::error::FeedResult;
use alloy_primitives::U256;
use compact_str::CompactString;
use futures_util::future::try_join_all;
use portfolio_core::{EulerPosition, TokenAmount};
use portfolio_rpc::abi::{self, IERC20, IERC4626};
use portfolio_rpc::EthClient;

#[derive(Debug, Clone)]
pub struct EulerClient {
    eth: EthClient,
    vaults: Vec<EulerVault>,
}

impl EulerClient {
    pub fn new(eth: EthClient, vaults: Vec<EulerVault>) -> Self {
        Self { eth, vaults }
    }

    /// Underlying assets `account` holds in `vault`.
    pub async fn position(&self, vault: &EulerVault, account: &str) -> FeedResult<EulerPosition> {
        let address = abi::parse_address(&vault.address)?;
        let account = abi::parse_address(account)?;
        let balance_call = IERC20::balanceOfCall { account };
        let (shares, decimals) = tokio::try_join!(
            self.eth.call(address, &balance_call),
            self.eth.call(address, &IERC20::decimalsCall {}),
        )?;

        let raw_assets = if shares.is_zero() {
            U256::ZERO
        } else {
            self.eth
                .call(address, &IERC4626::convertToAssetsCall { shares })
                .await?
        };

        Ok(EulerPosition {
            vault: vault.address.clone(),
            label: CompactString::from(vault.label.as_str()),
            asset: vault.asset,
            assets: TokenAmount::new(raw_assets, decimals),
        })
    }

    /// Non-zero positions of `account` across all configured vaults.
    pub async fn positions(&self, account: &str) -> FeedResult<Vec<EulerPosition>> {
        let all = try_join_all(self.vaults.iter().map(|v| self.position(v, account))).await?;
        Ok(all.into_iter().filter(|p| !p.assets.is_zero()).collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloy_sol_types::SolCall;
    use mockito::Matcher;
    use portfolio_core::Asset;
    use portfolio_rpc::{RpcConfig, RpcManager};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    const VAULT: &str = "0xD8b27CF359b7D15710a5BE299AF6e7Bf904984C2";
    const ACCOUNT: &str = "0x8357b66f74363e926de4186a449f365707c7fbad";

    fn client(url: String) -> EulerClient {
        let manager = RpcManager::new(&RpcConfig {
            endpoints: vec![url],
            min_interval_ms: 0,
            request_timeout_secs: 5,
            ..Default::default()
        })
        .unwrap();
        EulerClient::new(
            EthClient::new(Arc::new(manager)).unwrap(),
            vec![EulerVault {
                address: VAULT.to_string(),
                label: "eWETH-2".to_string(),
                asset: Some(Asset::Eth),
            }],
        )
    }

    fn word(value: U256) -> String {
        value.to_be_bytes::<32>().iter().map(|b| format!("{:02x}", b)).collect()
    }

    async fn answer(
        server: &mut mockito::ServerGuard,
        selector: [u8; 4],
        value: U256,
        hits: usize,
    ) -> mockito::Mock {
        let selector: String = selector.iter().map(|b| format!("{:02x}", b)).collect();
        server
            .mock("POST", "/")
            .match_body(Matcher::Regex(format!("\"data\":\"0x{}", selector)))
            .with_header("content-type", "application/json")
            .with_body(format!(r#"{{"jsonrpc":"2.0","id":1,"result":"0x{}"}}"#, word(value)))
            .expect(hits)
            .create_async()
            .await
    }

    #[tokio::test]
    async fn test_shares_are_converted_to_assets() {
        let mut server = mockito::Server::new_async().await;
        let shares = U256::from(2_000_000_000_000_000_000u64);
        let assets = U256::from(2_100_000_000_000_000_001u64);
        let mocks = vec![
            answer(&mut server, IERC20::balanceOfCall::SELECTOR, shares, 1).await,
            answer(&mut server, IERC20::decimalsCall::SELECTOR, U256::from(18u8), 1).await,
            answer(&mut server, IERC4626::convertToAssetsCall::SELECTOR, assets, 1).await,
        ];

        let positions = client(server.url()).positions(ACCOUNT).await.unwrap();
        assert_eq!(positions.len(), 1);
        assert_eq!(positions[0].label, "eWETH-2");
        assert_eq!(positions[0].assets.to_string(), "2.100000000000000001");

        for mock in mocks {
            mock.assert_async().await;
        }
    }

    #[tokio::test]
    async fn test_empty_vault_skips_conversion() {
        let mut server = mockito::Server::new_async().await;
        let mocks = vec![
            answer(&mut server, IERC20::balanceOfCall::SELECTOR, U256::ZERO, 1).await,
            answer(&mut server, IERC20::decimalsCall::SELECTOR, U256::from(18u8), 1).await,
            answer(&mut server, IERC4626::convertToAssetsCall::SELECTOR, U256::ZERO, 0).await,
        ];

        let positions = client(server.url()).positions(ACCOUNT).await.unwrap();
        assert!(positions.is_empty());

        for mock in mocks {
            mock.assert_async().await;
        }
    }
}

//! Bitcoin balances from an Esplora explorer (blockstream.info by default).

use crate::config::ExplorerConfig;
use crate::error::{FeedError, FeedResult};
use crate::http::{build_client, get_json};
use portfolio_core::is_btc_address;
use serde::Deserialize;

const SERVICE: &str = "esplora";

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct TxoStats {
    pub funded_txo_sum: u64,
    pub spent_txo_sum: u64,
}

impl TxoStats {
    fn net(&self) -> i64 {
        self.funded_txo_sum as i64 - self.spent_txo_sum as i64
    }
}

/// `GET /address/{addr}` response, trimmed to what the balance needs.
#[derive(Debug, Clone, Deserialize)]
pub struct AddressStats {
    pub chain_stats: TxoStats,
    #[serde(default)]
    pub mempool_stats: TxoStats,
}

impl AddressStats {
    /// Confirmed plus unconfirmed balance in satoshi.
    pub fn balance_sats(&self) -> i64 {
        self.chain_stats.net() + self.mempool_stats.net()
    }
}

#[derive(Debug, Clone)]
pub struct EsploraClient {
    http: reqwest::Client,
    base_url: String,
}

impl EsploraClient {
    pub fn new(config: &ExplorerConfig) -> FeedResult<Self> {
        Ok(Self::with_client(build_client(config.timeout())?, &config.base_url))
    }

    pub fn with_client(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn address_stats(&self, address: &str) -> FeedResult<AddressStats> {
        if !is_btc_address(address) {
            return Err(FeedError::InvalidAddress(address.to_string()));
        }
        let url = format!("{}/address/{}", self.base_url, address);
        get_json(&self.http, SERVICE, &url).await
    }

    /// Balance of `address` in satoshi.
    pub async fn balance_sats(&self, address: &str) -> FeedResult<i64> {
        Ok(self.address_stats(address).await?.balance_sats())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    const ADDRESS: &str = "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4";

    #[test]
    fn test_balance_includes_mempool() {
        let stats: AddressStats = serde_json::from_str(
            r#"{
                "address": "bc1qw508d6qejxtdg4y5r3zarvary0c5xw7kv8f3t4",
                "chain_stats": {"funded_txo_count": 3, "funded_txo_sum": 150000, "spent_txo_count": 1, "spent_txo_sum": 50000, "tx_count": 4},
                "mempool_stats": {"funded_txo_count": 1, "funded_txo_sum": 2500, "spent_txo_count": 0, "spent_txo_sum": 0, "tx_count": 1}
            }"#,
        )
        .unwrap();
        assert_eq!(stats.balance_sats(), 102_500);
    }

    #[test]
    fn test_missing_mempool_stats() {
        let stats: AddressStats = serde_json::from_str(
            r#"{"chain_stats": {"funded_txo_sum": 10, "spent_txo_sum": 10}}"#,
        )
        .unwrap();
        assert_eq!(stats.balance_sats(), 0);
    }

    #[tokio::test]
    async fn test_rejects_non_bitcoin_address() {
        let client = EsploraClient::new(&ExplorerConfig::default()).unwrap();
        let err = client
            .balance_sats("0x0C8eb038c58E0a9d8D66Bf5805A6eC0dfDaE6c4c")
            .await
            .unwrap_err();
        assert!(matches!(err, FeedError::InvalidAddress(_)));
    }

    #[test]
    fn test_base_url_is_normalized() {
        let client = EsploraClient::with_client(reqwest::Client::new(), "https://mempool.space/api/");
        assert_eq!(client.base_url, "https://mempool.space/api");
    }

    #[tokio::test]
    async fn test_balance_over_http() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", format!("/address/{}", ADDRESS).as_str())
            .with_header("content-type", "application/json")
            .with_body(r#"{"chain_stats":{"funded_txo_sum":80000,"spent_txo_sum":30000},"mempool_stats":{"funded_txo_sum":0,"spent_txo_sum":0}}"#)
            .create_async()
            .await;

        let client = EsploraClient::with_client(reqwest::Client::new(), &server.url());
        assert_eq!(client.balance_sats(ADDRESS).await.unwrap(), 50_000);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_errors_are_classified() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("GET", format!("/address/{}", ADDRESS).as_str())
            .with_status(429)
            .create_async()
            .await;

        let client = EsploraClient::with_client(reqwest::Client::new(), &server.url());
        let err = client.balance_sats(ADDRESS).await.unwrap_err();
        assert!(matches!(err, FeedError::RateLimitExceeded("esplora")));
        assert!(err.is_transient());
    }

    #[tokio::test]
    async fn test_transport_errors_hide_the_url() {
        let client =
            EsploraClient::with_client(reqwest::Client::new(), "http://127.0.0.1:1/SECRETKEY");
        let err = client.balance_sats(ADDRESS).await.unwrap_err();
        assert!(!err.to_string().contains("SECRETKEY"));
    }
}

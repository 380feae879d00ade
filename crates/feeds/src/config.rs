//! Collaborator endpoints and protocol deployments.

use portfolio_core::Asset;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Esplora-compatible Bitcoin explorer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExplorerConfig {
    pub base_url: String,
    pub timeout_secs: u64,
}

impl Default for ExplorerConfig {
    fn default() -> Self {
        Self {
            base_url: "https://blockstream.info/api".to_string(),
            timeout_secs: 10,
        }
    }
}

impl ExplorerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// CoinGecko-compatible spot price API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PriceConfig {
    pub base_url: String,
    /// How long a fetched quote is reused (s)
    pub cache_ttl_secs: u64,
}

impl Default for PriceConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.coingecko.com/api/v3".to_string(),
            cache_ttl_secs: 60,
        }
    }
}

impl PriceConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }
}

/// An ERC-4626 vault whose shares the bot reports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EulerVault {
    pub address: String,
    pub label: String,
    /// Native asset the vault holds; `None` means a USD stablecoin vault.
    #[serde(default)]
    pub asset: Option<Asset>,
}

/// DeFi deployments queried for every Ethereum address.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtocolsConfig {
    /// Compound v3 (Comet) market proxies
    pub compound_markets: Vec<String>,
    pub euler_vaults: Vec<EulerVault>,
    pub pendle_url: String,
}

impl Default for ProtocolsConfig {
    fn default() -> Self {
        Self {
            // cUSDTv3
            compound_markets: vec!["0x3Afdc9BCA9213A35503b077a6072F3D0d5AB0840".to_string()],
            euler_vaults: vec![EulerVault {
                address: "0xD8b27CF359b7D15710a5BE299AF6e7Bf904984C2".to_string(),
                label: "Euler WETH".to_string(),
                asset: Some(Asset::Eth),
            }],
            pendle_url: "https://api-v2.pendle.finance/core".to_string(),
        }
    }
}

//! Application configuration.

use portfolio_feeds::{ExplorerConfig, PriceConfig, ProtocolsConfig};
use portfolio_rpc::RpcConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;
use tracing::info;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Environment variable {0} is not set")]
    MissingEnv(&'static str),
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// RPC endpoint rotation and dispatch.
    pub rpc: RpcConfig,
    /// Bitcoin explorer.
    pub explorer: ExplorerConfig,
    /// Spot price feed.
    pub prices: PriceConfig,
    /// DeFi deployments to read.
    pub protocols: ProtocolsConfig,
    /// SQLite address book.
    pub database_url: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rpc: RpcConfig::default(),
            explorer: ExplorerConfig::default(),
            prices: PriceConfig::default(),
            protocols: ProtocolsConfig::default(),
            database_url: "sqlite:wallets.db".to_string(),
        }
    }
}

impl AppConfig {
    /// Load from a JSON file. A missing file yields the defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        match std::fs::read_to_string(path) {
            Ok(text) => Ok(serde_json::from_str(&text)?),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                info!("No config at {}, using defaults", path.display());
                Ok(Self::default())
            }
            Err(source) => Err(ConfigError::Io {
                path: path.display().to_string(),
                source,
            }),
        }
    }

    /// Apply `ETH_RPC_URLS` and `DATABASE_URL` from `var`.
    pub fn with_env<F>(mut self, var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(urls) = var("ETH_RPC_URLS") {
            self.rpc = self.rpc.with_endpoint_override(&urls);
        }
        if let Some(url) = var("DATABASE_URL").filter(|u| !u.trim().is_empty()) {
            self.database_url = url;
        }
        self
    }
}

/// Bot token from `TELEGRAM_TOKEN`.
pub fn telegram_token<F>(var: F) -> Result<String, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    var("TELEGRAM_TOKEN")
        .map(|t| t.trim().to_string())
        .filter(|t| !t.is_empty())
        .ok_or(ConfigError::MissingEnv("TELEGRAM_TOKEN"))
}

/// Process environment lookup for [`AppConfig::with_env`].
pub fn process_env(name: &str) -> Option<String> {
    std::env::var(name).ok()
}

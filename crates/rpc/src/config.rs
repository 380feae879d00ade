//! RPC manager configuration.

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Public Ethereum mainnet endpoints that need no API key.
pub const DEFAULT_ENDPOINTS: &[&str] = &[
    "https://ethereum.publicnode.com",
    "https://eth.llamarpc.com",
    "https://ethereum.blockpi.network/v1/rpc/public",
    "https://eth-mainnet.public.blastapi.io",
    "https://rpc.ankr.com/eth",
    "https://eth-mainnet.g.alchemy.com/v2/demo",
];

/// Configuration for endpoint rotation, throttling, caching and retries.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RpcConfig {
    /// Ordered endpoint URLs; rotation starts at the first one.
    pub endpoints: Vec<String>,
    /// Minimum spacing between two dispatches to one endpoint (ms)
    pub min_interval_ms: u64,
    /// How long a rate-limited or unauthorized endpoint sits out (s)
    pub cooldown_secs: u64,
    /// Response cache TTL (s)
    pub cache_ttl_secs: u64,
    /// Timeout for a single network call (s)
    pub request_timeout_secs: u64,
    /// Attempts per dispatch
    pub max_retries: u32,
    /// Upper bound on a whole batch (s)
    pub batch_deadline_secs: u64,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            endpoints: DEFAULT_ENDPOINTS.iter().map(|s| s.to_string()).collect(),
            min_interval_ms: 100,
            cooldown_secs: 300,
            cache_ttl_secs: 30,
            request_timeout_secs: 8,
            max_retries: 3,
            batch_deadline_secs: 60,
        }
    }
}

impl RpcConfig {
    /// Replace the endpoint list with a comma-separated override (e.g. `ETH_RPC_URLS`).
    /// Blank input leaves the list unchanged.
    pub fn with_endpoint_override(mut self, urls: &str) -> Self {
        let endpoints: Vec<String> = urls
            .split(',')
            .map(|s| s.trim().to_string())
            .filter(|s| !s.is_empty())
            .collect();
        if !endpoints.is_empty() {
            self.endpoints = endpoints;
        }
        self
    }

    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }

    pub fn cooldown(&self) -> Duration {
        Duration::from_secs(self.cooldown_secs)
    }

    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn batch_deadline(&self) -> Duration {
        Duration::from_secs(self.batch_deadline_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = RpcConfig::default();
        assert!(!config.endpoints.is_empty());
        assert_eq!(config.min_interval(), Duration::from_millis(100));
        assert_eq!(config.cooldown(), Duration::from_secs(300));
        assert_eq!(config.max_retries, 3);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: RpcConfig = serde_json::from_str(r#"{"cache_ttl_secs": 5}"#).unwrap();
        assert_eq!(config.cache_ttl(), Duration::from_secs(5));
        assert_eq!(config.request_timeout_secs, 8);
    }

    #[test]
    fn test_endpoint_override() {
        let config = RpcConfig::default().with_endpoint_override(" https://a.example , ,https://b.example");
        assert_eq!(config.endpoints, vec!["https://a.example", "https://b.example"]);

        let unchanged = RpcConfig::default().with_endpoint_override("  ");
        assert_eq!(unchanged.endpoints.len(), DEFAULT_ENDPOINTS.len());
    }
}

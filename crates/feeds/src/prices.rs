//! BTC/ETH spot prices in every reporting currency.

use crate::config::PriceConfig;
use crate::error::{FeedError, FeedResult};
use crate::http::{build_client, get_json};
use portfolio_core::{Asset, Fiat, FiatQuote, SpotPrices};
use portfolio_rpc::{CallSignature, ResponseCache};
use serde::Deserialize;
use serde_json::json;
use std::collections::HashMap;
use std::time::Duration;
use tracing::debug;

const SERVICE: &str = "coingecko";

#[derive(Debug, Deserialize)]
struct RawQuote {
    #[serde(default)]
    usd: Option<f64>,
    #[serde(default)]
    rub: Option<f64>,
}

/// Parse a `simple/price` body such as `{"bitcoin":{"usd":65000,"rub":6000000}, ...}`.
pub fn parse_simple_price(body: &str) -> FeedResult<SpotPrices> {
    let raw: HashMap<String, RawQuote> = serde_json::from_str(body)?;
    spot_prices(&raw)
}

fn spot_prices(raw: &HashMap<String, RawQuote>) -> FeedResult<SpotPrices> {
    let quote = |asset: Asset| -> FeedResult<FiatQuote> {
        let q = raw
            .get(asset.price_id())
            .ok_or_else(|| FeedError::ParseError(format!("no price for {}", asset.price_id())))?;
        match (q.usd, q.rub) {
            (Some(usd), Some(rub)) => Ok(FiatQuote::new(usd, rub)),
            _ => Err(FeedError::ParseError(format!(
                "incomplete quote for {}",
                asset.price_id()
            ))),
        }
    };
    Ok(SpotPrices::new(quote(Asset::Btc)?, quote(Asset::Eth)?))
}

/// Spot price client with a short-lived cache, so repeated reports reuse one quote.
#[derive(Debug)]
pub struct PriceClient {
    http: reqwest::Client,
    base_url: String,
    cache: ResponseCache<SpotPrices>,
}

impl PriceClient {
    pub fn new(config: &PriceConfig, http: reqwest::Client) -> Self {
        Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            cache: ResponseCache::new(config.cache_ttl()),
        }
    }

    /// Build with a dedicated client.
    pub fn standalone(config: &PriceConfig) -> FeedResult<Self> {
        Ok(Self::new(config, build_client(Duration::from_secs(10))?))
    }

    fn signature() -> CallSignature {
        let ids: Vec<&str> = [Asset::Btc, Asset::Eth].iter().map(|a| a.price_id()).collect();
        let currencies: Vec<String> = Fiat::ALL.iter().map(|f| f.code().to_string()).collect();
        CallSignature::new("simple/price", &json!([ids, currencies]))
    }

    pub async fn fetch(&self) -> FeedResult<SpotPrices> {
        let signature = Self::signature();
        if let Some(prices) = self.cache.get(&signature) {
            debug!("Using cached spot prices");
            return Ok(prices);
        }

        let currencies: Vec<String> = Fiat::ALL.iter().map(|f| f.code().to_string()).collect();
        let url = format!(
            "{}/simple/price?ids={},{}&vs_currencies={}",
            self.base_url,
            Asset::Btc.price_id(),
            Asset::Eth.price_id(),
            currencies.join(",")
        );
        let raw: HashMap<String, RawQuote> = get_json(&self.http, SERVICE, &url).await?;
        let prices = spot_prices(&raw)?;

        self.cache.put(signature, prices);
        Ok(prices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_parse_simple_price() {
        let prices = parse_simple_price(
            r#"{"bitcoin":{"usd":65000.5,"rub":6000000},"ethereum":{"usd":3000,"rub":270000}}"#,
        )
        .unwrap();
        assert_eq!(prices.btc, FiatQuote::new(65000.5, 6_000_000.0));
        assert_eq!(prices.eth.get(Fiat::Rub), 270_000.0);
    }

    #[test]
    fn test_missing_asset_or_currency() {
        assert!(matches!(
            parse_simple_price(r#"{"bitcoin":{"usd":1,"rub":1}}"#),
            Err(FeedError::ParseError(_))
        ));
        assert!(parse_simple_price(r#"{"bitcoin":{"usd":1},"ethereum":{"usd":1,"rub":1}}"#).is_err());
    }

    #[test]
    fn test_signature_is_stable() {
        assert_eq!(PriceClient::signature(), PriceClient::signature());
    }

    fn client_for(url: String) -> PriceClient {
        let config = PriceConfig {
            base_url: url,
            ..Default::default()
        };
        PriceClient::new(&config, reqwest::Client::new())
    }

    #[tokio::test]
    async fn test_fetch_is_cached() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_header("content-type", "application/json")
            .with_body(r#"{"bitcoin":{"usd":60000,"rub":5400000},"ethereum":{"usd":3000,"rub":270000}}"#)
            .expect(1)
            .create_async()
            .await;

        let client = client_for(server.url());
        let first = client.fetch().await.unwrap();
        let second = client.fetch().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first.btc.get(Fiat::Usd), 60_000.0);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_rate_limited_fetch() {
        let mut server = mockito::Server::new_async().await;
        let _limited = server
            .mock("GET", "/simple/price")
            .match_query(mockito::Matcher::Any)
            .with_status(429)
            .create_async()
            .await;

        let err = client_for(server.url()).fetch().await.unwrap_err();
        assert!(matches!(err, FeedError::RateLimitExceeded(SERVICE)));
        assert_eq!(err.suggested_retry_delay(), Some(Duration::from_secs(60)));
    }
}

//! Pendle LP valuations from the Pendle dashboard API.

use crate::error::{FeedError, FeedResult};
use crate::http::get_json;
use portfolio_core::{is_eth_address, PendlePosition};
use serde::Deserialize;

const SERVICE: &str = "pendle";

#[derive(Debug, Deserialize)]
struct DashboardResponse {
    #[serde(default)]
    positions: Vec<Option<ChainPositions>>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ChainPositions {
    #[serde(default)]
    open_positions: Vec<OpenPosition>,
}

#[derive(Debug, Deserialize)]
struct OpenPosition {
    #[serde(default)]
    lp: Option<LpValuation>,
}

#[derive(Debug, Deserialize)]
struct LpValuation {
    #[serde(default)]
    valuation: Option<f64>,
}

impl DashboardResponse {
    fn into_position(self) -> PendlePosition {
        let mut position = PendlePosition::default();
        for open in self.positions.into_iter().flatten().flat_map(|c| c.open_positions) {
            if let Some(valuation) = open.lp.and_then(|lp| lp.valuation) {
                position.valuation_usd += valuation;
                position.open_positions += 1;
            }
        }
        position
    }
}

/// Parse a dashboard response body. Null chain entries and positions without an LP leg are skipped.
pub fn parse_dashboard(body: &str) -> FeedResult<PendlePosition> {
    let response: DashboardResponse = serde_json::from_str(body)?;
    Ok(response.into_position())
}

#[derive(Debug, Clone)]
pub struct PendleClient {
    http: reqwest::Client,
    base_url: String,
}

impl PendleClient {
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn position(&self, address: &str) -> FeedResult<PendlePosition> {
        if !is_eth_address(address) {
            return Err(FeedError::InvalidAddress(address.to_string()));
        }
        let url = format!(
            "{}/v1/dashboard/positions/database/{}",
            self.base_url, address
        );
        let response: DashboardResponse = get_json(&self.http, SERVICE, &url).await?;
        Ok(response.into_position())
    }
}

//! Shared HTTP plumbing for REST collaborators.

use crate::error::{FeedError, FeedResult};
use serde::de::DeserializeOwned;
use std::time::Duration;
use tracing::debug;

/// Build the client every REST collaborator shares.
pub fn build_client(timeout: Duration) -> FeedResult<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(timeout)
        .user_agent(concat!("portfolio-bot/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| FeedError::from_reqwest("http", e))
}

/// GET `url` and decode the JSON body, mapping non-2xx statuses to errors.
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &reqwest::Client,
    service: &'static str,
    url: &str,
) -> FeedResult<T> {
    debug!("{}: GET {}", service, url);
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|e| FeedError::from_reqwest(service, e))?;

    let status = response.status();
    if !status.is_success() {
        debug!("{}: HTTP {}", service, status);
        return Err(FeedError::from_status(service, status.as_u16()));
    }

    let body = response
        .text()
        .await
        .map_err(|e| FeedError::from_reqwest(service, e))?;
    Ok(serde_json::from_str(&body)?)
}

//! Error types for collaborator lookups.

use portfolio_rpc::RpcError;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur while fetching balances, positions or prices.
#[derive(Debug, Clone, Error)]
pub enum FeedError {
    #[error("Request to {service} failed: {message}")]
    RequestFailed { service: &'static str, message: String },

    #[error("{service} returned HTTP {status}")]
    HttpStatus { service: &'static str, status: u16 },

    #[error("Rate limit exceeded by {0}")]
    RateLimitExceeded(&'static str),

    #[error("Failed to parse response: {0}")]
    ParseError(String),

    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error(transparent)]
    Rpc(#[from] RpcError),
}

/// Result type for feed operations.
pub type FeedResult<T> = Result<T, FeedError>;

impl From<serde_json::Error> for FeedError {
    fn from(err: serde_json::Error) -> Self {
        FeedError::ParseError(err.to_string())
    }
}

impl FeedError {
    /// Convert a `reqwest` error from `service`, dropping the request URL.
    pub fn from_reqwest(service: &'static str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return FeedError::Timeout(format!("{}: {}", service, err.without_url()));
        }
        if let Some(status) = err.status() {
            return FeedError::from_status(service, status.as_u16());
        }
        if err.is_decode() {
            return FeedError::ParseError(err.without_url().to_string());
        }
        FeedError::RequestFailed {
            service,
            message: err.without_url().to_string(),
        }
    }

    pub fn from_status(service: &'static str, status: u16) -> Self {
        match status {
            429 => FeedError::RateLimitExceeded(service),
            _ => FeedError::HttpStatus { service, status },
        }
    }

    /// Returns true if this error is transient and likely to succeed on retry.
    pub fn is_transient(&self) -> bool {
        match self {
            FeedError::RequestFailed { .. }
            | FeedError::Timeout(_)
            | FeedError::RateLimitExceeded(_) => true,
            FeedError::HttpStatus { status, .. } => *status >= 500,
            FeedError::Rpc(e) => e.is_retryable(),
            FeedError::ParseError(_) | FeedError::InvalidAddress(_) => false,
        }
    }

    /// Returns a suggested retry delay for this error type, if applicable.
    /// Returns None for errors that should not be retried.
    pub fn suggested_retry_delay(&self) -> Option<Duration> {
        match self {
            FeedError::RateLimitExceeded(_) => Some(Duration::from_secs(60)),
            FeedError::RequestFailed { .. } => Some(Duration::from_secs(5)),
            FeedError::Timeout(_) => Some(Duration::from_secs(2)),
            FeedError::HttpStatus { status, .. } if *status >= 500 => Some(Duration::from_secs(5)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(matches!(
            FeedError::from_status("esplora", 429),
            FeedError::RateLimitExceeded("esplora")
        ));
        let err = FeedError::from_status("pendle", 503);
        assert!(err.is_transient());
        assert_eq!(err.suggested_retry_delay(), Some(Duration::from_secs(5)));

        let err = FeedError::from_status("pendle", 404);
        assert!(!err.is_transient());
        assert_eq!(err.suggested_retry_delay(), None);
    }

    #[test]
    fn test_rpc_errors_pass_through() {
        let err: FeedError = RpcError::Timeout("node".into()).into();
        assert!(err.is_transient());
        assert_eq!(err.to_string(), "Timeout: node");

        let err: FeedError = RpcError::InvalidArgument("bad".into()).into();
        assert!(!err.is_transient());
    }
}

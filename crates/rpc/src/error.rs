//! Error types for RPC dispatch.

use thiserror::Error;

/// Errors that can occur while dispatching a read call.
#[derive(Debug, Clone, Error)]
pub enum RpcError {
    #[error("Rate limited by {endpoint}: {message}")]
    RateLimited { endpoint: String, message: String },

    #[error("Unauthorized at {endpoint} (HTTP {status})")]
    Unauthorized { endpoint: String, status: u16 },

    #[error("Request failed: {0}")]
    Transient(String),

    #[error("JSON-RPC error {code}: {message}")]
    Provider { code: i64, message: String },

    #[error("Malformed response: {0}")]
    Malformed(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    #[error("Invalid endpoint URL: {0}")]
    InvalidEndpoint(String),

    #[error("No RPC endpoints configured")]
    NoEndpoints,

    #[error("All {0} endpoints are cooling down")]
    NoEligibleEndpoints(usize),

    #[error("All {attempts} attempts failed, last error: {last}")]
    Exhausted {
        attempts: u32,
        #[source]
        last: Box<RpcError>,
    },
}

/// Result type for RPC operations.
pub type RpcResult<T> = Result<T, RpcError>;

/// Coarse classification driving the dispatcher's failover policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Endpoint signaled throttling: cooldown and rotate.
    RateLimited,
    /// Endpoint rejected access: cooldown and rotate.
    Unauthorized,
    /// Network, timeout, malformed or provider error: rotate only.
    Transient,
    /// Caller or configuration error: never retried.
    Invalid,
    /// Every attempt failed.
    Exhausted,
}

impl RpcError {
    /// Classify an HTTP error status returned by `endpoint`.
    pub fn from_status(endpoint: &str, status: u16, body: &str) -> Self {
        match status {
            429 => RpcError::RateLimited {
                endpoint: endpoint.to_string(),
                message: truncate(body, 200),
            },
            401 | 403 => RpcError::Unauthorized {
                endpoint: endpoint.to_string(),
                status,
            },
            _ => RpcError::Transient(format!("HTTP {} from {}: {}", status, endpoint, truncate(body, 200))),
        }
    }

    /// Convert a transport error, keeping status-based classification.
    pub fn from_reqwest(endpoint: &str, err: reqwest::Error) -> Self {
        if err.is_timeout() {
            return RpcError::Timeout(format!("{}: {}", endpoint, err));
        }
        if let Some(status) = err.status() {
            return RpcError::from_status(endpoint, status.as_u16(), &err.to_string());
        }
        if err.is_decode() {
            return RpcError::Malformed(err.to_string());
        }
        RpcError::Transient(err.to_string())
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            RpcError::RateLimited { .. } => ErrorKind::RateLimited,
            RpcError::Unauthorized { .. } => ErrorKind::Unauthorized,
            RpcError::Transient(_)
            | RpcError::Provider { .. }
            | RpcError::Malformed(_)
            | RpcError::Timeout(_) => ErrorKind::Transient,
            RpcError::InvalidArgument(_)
            | RpcError::InvalidEndpoint(_)
            | RpcError::NoEndpoints
            | RpcError::NoEligibleEndpoints(_) => ErrorKind::Invalid,
            RpcError::Exhausted { .. } => ErrorKind::Exhausted,
        }
    }

    /// Returns true if the failing endpoint should be taken out of rotation for a while.
    pub fn is_cooldown(&self) -> bool {
        matches!(self.kind(), ErrorKind::RateLimited | ErrorKind::Unauthorized)
    }

    /// Returns true if another endpoint may succeed where this one failed.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self.kind(),
            ErrorKind::RateLimited | ErrorKind::Unauthorized | ErrorKind::Transient
        )
    }

    /// The underlying cause for `Exhausted`, otherwise `self`.
    pub fn root_cause(&self) -> &RpcError {
        match self {
            RpcError::Exhausted { last, .. } => last.root_cause(),
            other => other,
        }
    }
}

impl From<serde_json::Error> for RpcError {
    fn from(err: serde_json::Error) -> Self {
        RpcError::Malformed(err.to_string())
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}

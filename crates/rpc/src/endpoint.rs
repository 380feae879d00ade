//! Endpoint pool with round-robin rotation and time-boxed disqualification.
//!
//! The pool keeps a single shared cursor. Disqualification stores a
//! `disqualified_until` instant per endpoint; eligibility is evaluated
//! against the clock on every check, so no background task is needed to
//! bring an endpoint back into rotation.

use crate::error::{RpcError, RpcResult};
use dashmap::DashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tokio::time::Instant;
use tracing::{info, warn};
use url::Url;

/// One node provider URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    index: usize,
    url: String,
    label: String,
}

impl Endpoint {
    fn parse(index: usize, raw: &str) -> RpcResult<Self> {
        let parsed = Url::parse(raw.trim())
            .map_err(|e| RpcError::InvalidEndpoint(format!("{}: {}", raw, e)))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(RpcError::InvalidEndpoint(format!(
                "{}: unsupported scheme {}",
                raw,
                parsed.scheme()
            )));
        }
        let label = parsed
            .host_str()
            .map(str::to_string)
            .ok_or_else(|| RpcError::InvalidEndpoint(format!("{}: missing host", raw)))?;

        Ok(Self {
            index,
            url: raw.trim().to_string(),
            label,
        })
    }

    /// Position of this endpoint in its pool.
    pub fn index(&self) -> usize {
        self.index
    }

    /// Full URL, possibly carrying an API key. Do not log it.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Host name, safe to show in logs and chat messages.
    pub fn label(&self) -> &str {
        &self.label
    }
}

impl std::fmt::Display for Endpoint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label)
    }
}

/// Point-in-time view of an endpoint for status reporting.
#[derive(Debug, Clone)]
pub struct EndpointStatus {
    pub label: String,
    pub is_current: bool,
    /// Remaining cooldown, `None` when eligible.
    pub cooldown_remaining: Option<Duration>,
}

/// Ordered, shared pool of interchangeable endpoints.
#[derive(Debug)]
pub struct EndpointPool {
    endpoints: Vec<Endpoint>,
    cursor: AtomicUsize,
    disqualified_until: DashMap<usize, Instant>,
}

impl EndpointPool {
    /// Build a pool from an ordered URL list. Fails on an empty list or an unparsable URL.
    pub fn new<I, S>(urls: I) -> RpcResult<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let endpoints = urls
            .into_iter()
            .enumerate()
            .map(|(index, url)| Endpoint::parse(index, url.as_ref()))
            .collect::<RpcResult<Vec<_>>>()?;

        if endpoints.is_empty() {
            return Err(RpcError::NoEndpoints);
        }

        Ok(Self {
            endpoints,
            cursor: AtomicUsize::new(0),
            disqualified_until: DashMap::new(),
        })
    }

    pub fn len(&self) -> usize {
        self.endpoints.len()
    }

    pub fn is_empty(&self) -> bool {
        self.endpoints.is_empty()
    }

    pub fn endpoints(&self) -> &[Endpoint] {
        &self.endpoints
    }

    /// Index the cursor currently points at.
    pub fn cursor(&self) -> usize {
        self.cursor.load(Ordering::Acquire) % self.endpoints.len()
    }

    /// Endpoint at the cursor.
    pub fn current(&self) -> Endpoint {
        self.endpoints[self.cursor()].clone()
    }

    /// Move the cursor to the next endpoint, wrapping after the last one.
    pub fn advance(&self) -> Endpoint {
        let len = self.endpoints.len();
        let previous = self
            .cursor
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |i| Some((i + 1) % len))
            .unwrap_or_else(|i| i);
        let next = &self.endpoints[(previous + 1) % len];
        info!("Switched to RPC endpoint: {}", next);
        next.clone()
    }

    /// Advance only if the cursor still points at `endpoint`.
    ///
    /// Concurrent units failing on the same endpoint then move the cursor
    /// once instead of skipping past healthy endpoints.
    pub fn advance_past(&self, endpoint: &Endpoint) -> Endpoint {
        let len = self.endpoints.len();
        let from = endpoint.index % len;
        match self
            .cursor
            .compare_exchange(from, (from + 1) % len, Ordering::AcqRel, Ordering::Acquire)
        {
            Ok(_) => {
                let next = &self.endpoints[(from + 1) % len];
                info!("Switched to RPC endpoint: {}", next);
                next.clone()
            }
            Err(_) => self.current(),
        }
    }

    /// Take `endpoint` out of rotation for `duration`.
    ///
    /// A later, longer disqualification extends the window; a shorter one never shrinks it.
    pub fn disqualify(&self, endpoint: &Endpoint, duration: Duration) {
        let until = Instant::now() + duration;
        self.disqualified_until
            .entry(endpoint.index)
            .and_modify(|current| {
                if until > *current {
                    *current = until;
                }
            })
            .or_insert(until);
        warn!(
            "Marked endpoint as unavailable for {:?}: {}",
            duration, endpoint
        );
    }

    /// Returns true unless `endpoint` is inside a disqualification window.
    pub fn is_eligible(&self, endpoint: &Endpoint) -> bool {
        self.cooldown_remaining(endpoint).is_none()
    }

    /// Remaining disqualification time, clearing the record once it has expired.
    pub fn cooldown_remaining(&self, endpoint: &Endpoint) -> Option<Duration> {
        let until = self.disqualified_until.get(&endpoint.index).map(|r| *r)?;
        let now = Instant::now();
        if now >= until {
            if self
                .disqualified_until
                .remove_if(&endpoint.index, |_, u| now >= *u)
                .is_some()
            {
                info!("Endpoint back in rotation: {}", endpoint);
            }
            None
        } else {
            Some(until - now)
        }
    }

    /// Number of endpoints currently eligible.
    pub fn eligible_count(&self) -> usize {
        self.endpoints.iter().filter(|e| self.is_eligible(e)).count()
    }

    /// Status of every endpoint in pool order.
    pub fn status(&self) -> Vec<EndpointStatus> {
        let cursor = self.cursor();
        self.endpoints
            .iter()
            .map(|e| EndpointStatus {
                label: e.label.clone(),
                is_current: e.index == cursor,
                cooldown_remaining: self.cooldown_remaining(e),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pool() -> EndpointPool {
        EndpointPool::new([
            "https://a.example/rpc",
            "https://b.example",
            "https://c.example/v2/secret-key",
        ])
        .unwrap()
    }

    #[test]
    fn test_pool_rejects_empty_and_invalid() {
        assert!(matches!(
            EndpointPool::new(Vec::<String>::new()),
            Err(RpcError::NoEndpoints)
        ));
        assert!(matches!(
            EndpointPool::new(["not a url"]),
            Err(RpcError::InvalidEndpoint(_))
        ));
        assert!(matches!(
            EndpointPool::new(["wss://a.example"]),
            Err(RpcError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_label_hides_path() {
        let pool = pool();
        assert_eq!(pool.endpoints()[2].label(), "c.example");
        assert_eq!(pool.endpoints()[2].to_string(), "c.example");
    }

    #[test]
    fn test_advance_is_circular() {
        let pool = pool();
        let start = pool.cursor();
        for _ in 0..pool.len() {
            pool.advance();
        }
        assert_eq!(pool.cursor(), start);

        assert_eq!(pool.advance().label(), "b.example");
        assert_eq!(pool.advance().label(), "c.example");
        assert_eq!(pool.advance().label(), "a.example");
    }

    #[test]
    fn test_advance_past_moves_once() {
        let pool = pool();
        let a = pool.current();
        assert_eq!(pool.advance_past(&a).label(), "b.example");
        // A second unit that also failed on A must not skip B.
        assert_eq!(pool.advance_past(&a).label(), "b.example");
        assert_eq!(pool.cursor(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_disqualification_expires() {
        let pool = pool();
        let a = pool.current();
        assert!(pool.is_eligible(&a));

        pool.disqualify(&a, Duration::from_secs(300));
        assert!(!pool.is_eligible(&a));
        assert_eq!(pool.eligible_count(), 2);

        tokio::time::advance(Duration::from_secs(299)).await;
        assert!(!pool.is_eligible(&a));

        tokio::time::advance(Duration::from_secs(1)).await;
        assert!(pool.is_eligible(&a));
        assert_eq!(pool.eligible_count(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_shorter_disqualification_does_not_shrink_window() {
        let pool = pool();
        let b = pool.endpoints()[1].clone();
        pool.disqualify(&b, Duration::from_secs(60));
        pool.disqualify(&b, Duration::from_secs(5));

        tokio::time::advance(Duration::from_secs(10)).await;
        assert!(!pool.is_eligible(&b));
        let remaining = pool.cooldown_remaining(&b).unwrap();
        assert_eq!(remaining, Duration::from_secs(50));
    }

    #[test]
    fn test_status_marks_current() {
        let pool = pool();
        pool.advance();
        let status = pool.status();
        assert_eq!(status.len(), 3);
        assert!(!status[0].is_current);
        assert!(status[1].is_current);
        assert!(status.iter().all(|s| s.cooldown_remaining.is_none()));
    }
}

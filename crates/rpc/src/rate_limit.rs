//! Per-endpoint minimum-interval throttle.

use crate::endpoint::Endpoint;
use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Spaces out dispatches to the same endpoint by at least `min_interval`.
///
/// Each endpoint has its own slot guarded by an async mutex. The mutex is
/// held across the wait, so concurrent callers for one endpoint queue up
/// behind each other and never observe the same stale timestamp. Callers
/// targeting other endpoints use other slots and are never delayed.
#[derive(Debug)]
pub struct RateLimiter {
    min_interval: Duration,
    last_dispatch: DashMap<String, Arc<Mutex<Option<Instant>>>>,
}

impl RateLimiter {
    pub fn new(min_interval: Duration) -> Self {
        Self {
            min_interval,
            last_dispatch: DashMap::new(),
        }
    }

    pub fn min_interval(&self) -> Duration {
        self.min_interval
    }

    /// Wait until `endpoint` may be used again, then record the dispatch.
    ///
    /// Returns how long the caller was held back.
    pub async fn throttle(&self, endpoint: &Endpoint) -> Duration {
        let slot = Arc::clone(
            self.last_dispatch
                .entry(endpoint.url().to_string())
                .or_insert_with(|| Arc::new(Mutex::new(None)))
                .value(),
        );

        let mut last = slot.lock().await;
        let mut waited = Duration::ZERO;

        if let Some(previous) = *last {
            let ready_at = previous + self.min_interval;
            let now = Instant::now();
            if ready_at > now {
                waited = ready_at - now;
                debug!("Throttling {} for {:?}", endpoint, waited);
                tokio::time::sleep_until(ready_at).await;
            }
        }

        *last = Some(Instant::now());
        waited
    }

    /// Time of the last recorded dispatch to `endpoint`, if any.
    pub async fn last_dispatch(&self, endpoint: &Endpoint) -> Option<Instant> {
        let slot = self.last_dispatch.get(endpoint.url()).map(|r| Arc::clone(r.value()))?;
        let last = slot.lock().await;
        *last
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::EndpointPool;

    fn endpoints() -> (Endpoint, Endpoint) {
        let pool = EndpointPool::new(["https://a.example", "https://b.example"]).unwrap();
        (pool.endpoints()[0].clone(), pool.endpoints()[1].clone())
    }

    #[tokio::test(start_paused = true)]
    async fn test_first_dispatch_is_immediate() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let (a, _) = endpoints();
        assert_eq!(limiter.throttle(&a).await, Duration::ZERO);
        assert!(limiter.last_dispatch(&a).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn test_same_endpoint_is_spaced() {
        let limiter = Arc::new(RateLimiter::new(Duration::from_millis(100)));
        let (a, _) = endpoints();

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                let a = a.clone();
                tokio::spawn(async move {
                    limiter.throttle(&a).await;
                    Instant::now()
                })
            })
            .collect();

        let mut times = Vec::new();
        for task in tasks {
            times.push(task.await.unwrap());
        }
        times.sort();

        for pair in times.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(100));
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_endpoints_are_independent() {
        let limiter = RateLimiter::new(Duration::from_secs(10));
        let (a, b) = endpoints();

        limiter.throttle(&a).await;
        let started = Instant::now();
        // Saturated A must not hold up B.
        assert_eq!(limiter.throttle(&b).await, Duration::ZERO);
        assert_eq!(Instant::now(), started);

        // A second call to A waits out the full interval.
        assert_eq!(limiter.throttle(&a).await, Duration::from_secs(10));
    }

    #[tokio::test(start_paused = true)]
    async fn test_elapsed_interval_needs_no_wait() {
        let limiter = RateLimiter::new(Duration::from_millis(100));
        let (a, _) = endpoints();
        limiter.throttle(&a).await;
        tokio::time::advance(Duration::from_millis(150)).await;
        assert_eq!(limiter.throttle(&a).await, Duration::ZERO);
    }
}

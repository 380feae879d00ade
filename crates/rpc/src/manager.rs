//! Retry/failover dispatcher.
//!
//! Wraps an idempotent read with cache lookup, per-endpoint throttling,
//! round-robin endpoint selection and retry with rotation:
//!
//! - rate-limited or unauthorized: endpoint sits out a cooldown, rotate
//! - any other transient failure: rotate, no cooldown
//! - caller/configuration errors: returned as-is, never retried

use crate::batch::{self, BatchResult};
use crate::cache::{CallSignature, ResponseCache};
use crate::config::RpcConfig;
use crate::endpoint::{Endpoint, EndpointPool};
use crate::error::{RpcError, RpcResult};
use crate::rate_limit::RateLimiter;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tracing::{debug, warn};

/// Per-dispatch knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchOptions {
    /// Serve from and store into the response cache.
    pub use_cache: bool,
    /// Attempts against eligible endpoints before giving up (at least one is made).
    pub max_retries: u32,
}

impl Default for DispatchOptions {
    fn default() -> Self {
        Self {
            use_cache: true,
            max_retries: 3,
        }
    }
}

impl DispatchOptions {
    pub fn uncached(mut self) -> Self {
        self.use_cache = false;
        self
    }

    pub fn with_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }
}

/// Process-wide dispatcher state: endpoint pool, rate limiter and response cache.
///
/// Construct once at startup and share via `Arc`.
#[derive(Debug)]
pub struct RpcManager {
    pool: EndpointPool,
    limiter: RateLimiter,
    cache: ResponseCache<Value>,
    cooldown: Duration,
    call_timeout: Duration,
    batch_deadline: Duration,
    defaults: DispatchOptions,
}

impl RpcManager {
    pub fn new(config: &RpcConfig) -> RpcResult<Self> {
        Ok(Self {
            pool: EndpointPool::new(&config.endpoints)?,
            limiter: RateLimiter::new(config.min_interval()),
            cache: ResponseCache::new(config.cache_ttl()),
            cooldown: config.cooldown(),
            call_timeout: config.request_timeout(),
            batch_deadline: config.batch_deadline(),
            defaults: DispatchOptions {
                use_cache: true,
                max_retries: config.max_retries,
            },
        })
    }

    pub fn pool(&self) -> &EndpointPool {
        &self.pool
    }

    pub fn limiter(&self) -> &RateLimiter {
        &self.limiter
    }

    pub fn cache(&self) -> &ResponseCache<Value> {
        &self.cache
    }

    /// Options built from configuration.
    pub fn options(&self) -> DispatchOptions {
        self.defaults
    }

    pub fn call_timeout(&self) -> Duration {
        self.call_timeout
    }

    /// Run `call` against the selected endpoint until it succeeds or attempts run out.
    ///
    /// `call` must be an idempotent read: it may run several times against
    /// different endpoints. An ineligible endpoint is skipped without using
    /// up an attempt; if a full lap finds no eligible endpoint the dispatch
    /// stops early.
    pub async fn dispatch<T, F, Fut>(
        &self,
        signature: &CallSignature,
        options: DispatchOptions,
        call: F,
    ) -> RpcResult<T>
    where
        T: Serialize + DeserializeOwned,
        F: Fn(Endpoint) -> Fut,
        Fut: Future<Output = RpcResult<T>>,
    {
        if options.use_cache {
            if let Some(hit) = self.cache.get(signature) {
                match serde_json::from_value::<T>(hit) {
                    Ok(value) => {
                        debug!("Cache hit: {}", signature);
                        return Ok(value);
                    }
                    Err(e) => debug!("Ignoring undecodable cache entry {}: {}", signature, e),
                }
            }
        }

        let max_attempts = options.max_retries.max(1);
        let mut attempts = 0u32;
        let mut skipped = 0usize;
        let mut last_error: Option<RpcError> = None;

        while attempts < max_attempts {
            let endpoint = self.pool.current();

            if !self.pool.is_eligible(&endpoint) {
                skipped += 1;
                if skipped >= self.pool.len() {
                    debug!("No eligible endpoint for {}", signature);
                    break;
                }
                self.pool.advance_past(&endpoint);
                continue;
            }
            skipped = 0;
            attempts += 1;

            self.limiter.throttle(&endpoint).await;

            let outcome = match tokio::time::timeout(self.call_timeout, call(endpoint.clone())).await {
                Ok(result) => result,
                Err(_) => Err(RpcError::Timeout(format!(
                    "{} did not answer within {:?}",
                    endpoint, self.call_timeout
                ))),
            };

            match outcome {
                Ok(value) => {
                    if options.use_cache {
                        match serde_json::to_value(&value) {
                            Ok(json) => self.cache.put(signature.clone(), json),
                            Err(e) => debug!("Not caching {}: {}", signature, e),
                        }
                    }
                    return Ok(value);
                }
                Err(err) if !err.is_retryable() => return Err(err),
                Err(err) => {
                    if err.is_cooldown() {
                        warn!(
                            "Endpoint {} refused request ({:?}), cooling down: {}",
                            endpoint,
                            err.kind(),
                            err
                        );
                        self.pool.disqualify(&endpoint, self.cooldown);
                    } else {
                        warn!(
                            "Request failed on endpoint {} (attempt {}/{}): {}",
                            endpoint, attempts, max_attempts, err
                        );
                    }
                    self.pool.advance_past(&endpoint);
                    last_error = Some(err);
                }
            }
        }

        match last_error {
            Some(last) => Err(RpcError::Exhausted {
                attempts,
                last: Box::new(last),
            }),
            None => Err(RpcError::NoEligibleEndpoints(self.pool.len())),
        }
    }

    /// Fan `per_item` out over `items` under the configured batch deadline.
    pub async fn run_batch<I, K, T, E, F, Fut>(&self, items: I, per_item: F) -> BatchResult<K, T, E>
    where
        I: IntoIterator<Item = K>,
        K: Clone + Eq + Hash + std::fmt::Display,
        E: From<RpcError> + std::fmt::Display,
        F: Fn(K) -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        batch::run_batch(items, Some(self.batch_deadline), per_item).await
    }
}

//! Short-TTL response cache keyed by call signature.

use dashmap::DashMap;
use serde_json::Value;
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Entries above this count trigger a sweep of expired entries on insert.
const SWEEP_THRESHOLD: usize = 4096;

/// Stable identity of a logical read: method name plus serialized arguments.
///
/// Arguments are rendered through `serde_json::Value`, whose object maps are
/// key-sorted, so equal arguments always produce equal signatures.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CallSignature(String);

impl CallSignature {
    pub fn new(method: &str, params: &Value) -> Self {
        Self(format!("{}:{}", method, params))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for CallSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
struct CacheEntry<V> {
    written_at: Instant,
    value: V,
}

/// Memoizes read results for a fixed TTL.
///
/// An entry is served strictly less than `ttl` after it was written. Stale
/// entries are ignored and overwritten by the next `put`.
#[derive(Debug)]
pub struct ResponseCache<V> {
    ttl: Duration,
    entries: DashMap<CallSignature, CacheEntry<V>>,
}

impl<V: Clone> ResponseCache<V> {
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: DashMap::new(),
        }
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    /// Fresh value for `key`, or `None` on a miss or a stale entry.
    pub fn get(&self, key: &CallSignature) -> Option<V> {
        let entry = self.entries.get(key)?;
        if entry.written_at.elapsed() < self.ttl {
            Some(entry.value.clone())
        } else {
            None
        }
    }

    pub fn put(&self, key: CallSignature, value: V) {
        if self.entries.len() >= SWEEP_THRESHOLD {
            let removed = self.purge_expired();
            debug!("Swept {} expired cache entries", removed);
        }
        self.entries.insert(
            key,
            CacheEntry {
                written_at: Instant::now(),
                value,
            },
        );
    }

    /// Drop every expired entry. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.entries.len();
        let ttl = self.ttl;
        self.entries.retain(|_, entry| entry.written_at.elapsed() < ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

//! Concurrent per-item fan-out.

use crate::error::RpcError;
use futures_util::future::join_all;
use std::collections::{HashMap, HashSet};
use std::fmt::Display;
use std::future::Future;
use std::hash::Hash;
use std::time::Duration;
use tokio::time::Instant;
use tracing::{debug, warn};

/// Per-item outcome of a batch, in input order.
///
/// Every distinct input key appears exactly once. A failed item carries its
/// error instead of a zero value, so "balance is zero" and "lookup failed"
/// stay distinguishable.
#[derive(Debug)]
pub struct BatchResult<K, T, E = RpcError> {
    entries: Vec<(K, Result<T, E>)>,
}

impl<K: Eq + Hash, T, E> BatchResult<K, T, E> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn get(&self, key: &K) -> Option<&Result<T, E>> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, r)| r)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&K, &Result<T, E>)> {
        self.entries.iter().map(|(k, r)| (k, r))
    }

    pub fn successes(&self) -> impl Iterator<Item = (&K, &T)> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.as_ref().ok().map(|v| (k, v)))
    }

    pub fn failures(&self) -> impl Iterator<Item = (&K, &E)> {
        self.entries
            .iter()
            .filter_map(|(k, r)| r.as_ref().err().map(|e| (k, e)))
    }

    pub fn failure_count(&self) -> usize {
        self.failures().count()
    }

    /// Value for `key`, falling back to `T::default()` when the item failed or is unknown.
    pub fn value_or_default(&self, key: &K) -> T
    where
        T: Clone + Default,
    {
        match self.get(key) {
            Some(Ok(value)) => value.clone(),
            _ => T::default(),
        }
    }

    pub fn into_entries(self) -> Vec<(K, Result<T, E>)> {
        self.entries
    }

    pub fn into_map(self) -> HashMap<K, Result<T, E>> {
        self.entries.into_iter().collect()
    }
}

/// Run `per_item` for every distinct item concurrently and collect each outcome.
///
/// Never fails as a whole. Duplicate items are run once. With a `deadline`,
/// items still running when it passes resolve to [`RpcError::Timeout`] while
/// finished items keep their results.
pub async fn run_batch<I, K, T, E, F, Fut>(
    items: I,
    deadline: Option<Duration>,
    per_item: F,
) -> BatchResult<K, T, E>
where
    I: IntoIterator<Item = K>,
    K: Clone + Eq + Hash + Display,
    E: From<RpcError> + Display,
    F: Fn(K) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut seen = HashSet::new();
    let keys: Vec<K> = items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect();

    let started = Instant::now();
    let until = deadline.map(|d| started + d);

    let units = keys.iter().map(|key| {
        let work = per_item(key.clone());
        async move {
            match until {
                Some(until) => tokio::time::timeout_at(until, work)
                    .await
                    .unwrap_or_else(|_| {
                        Err(E::from(RpcError::Timeout("batch deadline exceeded".to_string())))
                    }),
                None => work.await,
            }
        }
    });
    let results = join_all(units).await;

    let entries: Vec<(K, Result<T, E>)> = keys.into_iter().zip(results).collect();
    for (key, result) in &entries {
        if let Err(e) = result {
            warn!("Batch item {} failed: {}", key, e);
        }
    }
    debug!(
        "Batch of {} finished in {:?}",
        entries.len(),
        started.elapsed()
    );

    BatchResult { entries }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RpcResult;
    use pretty_assertions::assert_eq;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn lookup(item: u32) -> RpcResult<u32> {
        if item % 3 == 0 {
            Err(RpcError::Transient(format!("item {} unavailable", item)))
        } else {
            Ok(item * 10)
        }
    }

    #[tokio::test]
    async fn test_failures_are_isolated() {
        let result = run_batch(1..=9u32, None, lookup).await;

        assert_eq!(result.len(), 9);
        assert_eq!(result.failure_count(), 3);
        let ok: Vec<(u32, u32)> = result.successes().map(|(k, v)| (*k, *v)).collect();
        assert_eq!(ok, vec![(1, 10), (2, 20), (4, 40), (5, 50), (7, 70), (8, 80)]);
        assert!(matches!(result.get(&6), Some(Err(RpcError::Transient(_)))));
        assert_eq!(result.value_or_default(&6), 0);
        assert_eq!(result.value_or_default(&7), 70);
    }

    #[tokio::test]
    async fn test_duplicates_run_once() {
        let calls = AtomicUsize::new(0);
        let result = run_batch(["a", "b", "a", "c", "b"], None, |item: &str| {
            let calls = &calls;
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, RpcError>(item.len())
            }
        })
        .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let keys: Vec<&str> = result.iter().map(|(k, _)| *k).collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn test_empty_batch() {
        let result = run_batch(Vec::<u32>::new(), None, lookup).await;
        assert!(result.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_items_run_concurrently() {
        let started = Instant::now();
        let result = run_batch(1..=5u32, None, |item| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, RpcError>(item)
        })
        .await;

        assert_eq!(result.len(), 5);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_deadline_keeps_finished_items() {
        let result = run_batch(1..=3u32, Some(Duration::from_secs(5)), |item| async move {
            if item == 2 {
                tokio::time::sleep(Duration::from_secs(60)).await;
            }
            Ok::<_, RpcError>(item)
        })
        .await;

        let map = result.into_map();
        assert_eq!(map.len(), 3);
        assert!(matches!(map[&1], Ok(1)));
        assert!(matches!(map[&2], Err(RpcError::Timeout(_))));
        assert!(matches!(map[&3], Ok(3)));
    }
}

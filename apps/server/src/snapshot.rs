//! One-shot dump of every stored address's Compound v3 position.

use chrono::{DateTime, Utc};
use portfolio_bot::{Database, DbError};
use portfolio_core::{partition_addresses, CometPosition};
use portfolio_feeds::{CompoundClient, FeedError};
use portfolio_rpc::{BatchResult, RpcManager};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("No Compound market configured")]
    NoMarket,
    #[error(transparent)]
    Db(#[from] DbError),
    #[error("Failed to write {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// One address in the snapshot file.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum AddressSnapshot {
    Position {
        ts: i64,
        base_symbol: String,
        supplied: String,
        borrowed: String,
        /// `[symbol, amount]` pairs
        collaterals: Vec<(String, String)>,
    },
    Failed {
        error: String,
    },
}

impl AddressSnapshot {
    fn new(result: &Result<CometPosition, FeedError>, ts: i64) -> Self {
        match result {
            Ok(p) => AddressSnapshot::Position {
                ts,
                base_symbol: p.base_symbol.to_string(),
                // Exact decimal strings, never routed through f64.
                supplied: p.supplied.to_string(),
                borrowed: p.borrowed.to_string(),
                collaterals: p
                    .collaterals
                    .iter()
                    .map(|c| (c.symbol.to_string(), c.amount.to_string()))
                    .collect(),
            },
            Err(e) => AddressSnapshot::Failed {
                error: e.to_string(),
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    /// RFC 3339 time the snapshot was taken
    pub time: String,
    pub addresses: BTreeMap<String, AddressSnapshot>,
}

impl Snapshot {
    pub fn from_batch(batch: &BatchResult<String, CometPosition, FeedError>, at: DateTime<Utc>) -> Self {
        let ts = at.timestamp();
        Self {
            time: at.to_rfc3339(),
            addresses: batch
                .iter()
                .map(|(address, result)| (address.clone(), AddressSnapshot::new(result, ts)))
                .collect(),
        }
    }

    /// Write as pretty JSON, replacing `path` only once the file is complete.
    pub fn write(&self, path: &Path) -> Result<(), SnapshotError> {
        let json = serde_json::to_string_pretty(self)?;
        let tmp = path.with_extension("tmp");
        let io_err = |source| SnapshotError::Io {
            path: path.display().to_string(),
            source,
        };
        std::fs::write(&tmp, json).map_err(io_err)?;
        std::fs::rename(&tmp, path).map_err(io_err)
    }
}

/// Read the Compound position of every stored Ethereum address.
pub async fn collect(
    db: &Database,
    compound: &CompoundClient,
    manager: &RpcManager,
) -> Result<Snapshot, SnapshotError> {
    let market = compound.markets().first().ok_or(SnapshotError::NoMarket)?;
    let all = db.list_all_addresses().await?;
    let (_, eth) = partition_addresses(&all);
    info!("Snapshotting {} Ethereum addresses on {}", eth.len(), market);

    let batch = manager
        .run_batch(eth, |address: String| async move {
            compound.position(market, &address).await
        })
        .await;

    for (address, err) in batch.failures() {
        warn!("Snapshot of {} failed: {}", address, err);
    }
    Ok(Snapshot::from_batch(&batch, Utc::now()))
}

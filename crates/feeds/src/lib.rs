//! Balance, position and price lookups behind the portfolio report.
//!
//! ## Architecture
//!
//! - `explorer` - Bitcoin balances from an Esplora REST API
//! - `compound` / `euler` - DeFi positions read with `eth_call` through the RPC dispatcher
//! - `pendle` - LP valuations from the Pendle dashboard API
//! - `prices` - BTC/ETH spot prices in USD and RUB
//! - `source` - `PortfolioSource`, the seam portfolio aggregation is written against

pub mod compound;
pub mod config;
pub mod error;
pub mod euler;
pub mod explorer;
pub mod http;
pub mod pendle;
pub mod prices;
pub mod source;

pub use compound::CompoundClient;
pub use config::{EulerVault, ExplorerConfig, PriceConfig, ProtocolsConfig};
pub use error::{FeedError, FeedResult};
pub use euler::EulerClient;
pub use explorer::{AddressStats, EsploraClient};
pub use pendle::PendleClient;
pub use prices::PriceClient;
pub use source::{Collaborators, PortfolioSource};

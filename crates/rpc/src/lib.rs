//! Failover dispatch of read calls across interchangeable Ethereum RPC endpoints.
//!
//! ## Architecture
//!
//! - `endpoint` - Round-robin endpoint pool with time-boxed disqualification
//! - `rate_limit` - Per-endpoint minimum-interval throttle
//! - `cache` - Short-TTL memoization keyed by call signature
//! - `manager` - Retry/failover dispatcher tying the above together
//! - `batch` - Concurrent per-item fan-out that never fails as a whole
//! - `eth` / `abi` - JSON-RPC transport and the contract-call encoding it needs

pub mod abi;
pub mod batch;
pub mod cache;
pub mod config;
pub mod endpoint;
pub mod error;
pub mod eth;
pub mod manager;
pub mod rate_limit;

pub use batch::{run_batch, BatchResult};
pub use cache::{CallSignature, ResponseCache};
pub use config::RpcConfig;
pub use endpoint::{Endpoint, EndpointPool, EndpointStatus};
pub use error::{ErrorKind, RpcError, RpcResult};
pub use eth::EthClient;
pub use manager::{DispatchOptions, RpcManager};
pub use rate_limit::RateLimiter;

//! Ethereum JSON-RPC reads routed through the dispatcher.

use crate::abi;
use crate::cache::CallSignature;
use crate::endpoint::Endpoint;
use crate::error::{RpcError, RpcResult};
use crate::manager::{DispatchOptions, RpcManager};
use alloy_primitives::{Address, Bytes, U256};
use alloy_sol_types::SolCall;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::debug;

/// JSON-RPC error codes providers use for throttling.
const RATE_LIMIT_CODES: &[i64] = &[429, -32005];

/// Code geth returns for `execution reverted`.
const EXECUTION_REVERTED: i64 = 3;

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcErrorObject>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcErrorObject {
    code: i64,
    #[serde(default)]
    message: String,
}

impl JsonRpcResponse {
    fn into_result<T: DeserializeOwned>(self, endpoint: &str) -> RpcResult<T> {
        if let Some(err) = self.error {
            return Err(classify_rpc_error(endpoint, err.code, err.message));
        }
        let result = self
            .result
            .ok_or_else(|| RpcError::Malformed("response has neither result nor error".to_string()))?;
        Ok(serde_json::from_value(result)?)
    }
}

/// Map a JSON-RPC error object onto the dispatcher taxonomy.
fn classify_rpc_error(endpoint: &str, code: i64, message: String) -> RpcError {
    let lower = message.to_lowercase();
    if RATE_LIMIT_CODES.contains(&code)
        || lower.contains("rate limit")
        || lower.contains("too many requests")
    {
        RpcError::RateLimited {
            endpoint: endpoint.to_string(),
            message,
        }
    } else if code == EXECUTION_REVERTED || lower.contains("execution reverted") {
        // Deterministic: every endpoint would revert the same way.
        RpcError::InvalidArgument(message)
    } else {
        RpcError::Provider { code, message }
    }
}

/// Parse a hex `QUANTITY` such as `"0x1bc16d674ec80000"`.
pub fn parse_quantity(raw: &str) -> RpcResult<U256> {
    let digits = raw
        .strip_prefix("0x")
        .ok_or_else(|| RpcError::Malformed(format!("quantity without 0x prefix: {}", raw)))?;
    if digits.is_empty() {
        return Ok(U256::ZERO);
    }
    U256::from_str_radix(digits, 16)
        .map_err(|e| RpcError::Malformed(format!("quantity {}: {}", raw, e)))
}

/// Read-only Ethereum client. Every request goes through the shared [`RpcManager`].
#[derive(Debug, Clone)]
pub struct EthClient {
    manager: Arc<RpcManager>,
    http: reqwest::Client,
}

impl EthClient {
    pub fn new(manager: Arc<RpcManager>) -> RpcResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(manager.call_timeout())
            .build()
            .map_err(|e| RpcError::Transient(format!("HTTP client: {}", e)))?;
        Ok(Self::with_http(manager, http))
    }

    pub fn with_http(manager: Arc<RpcManager>, http: reqwest::Client) -> Self {
        Self { manager, http }
    }

    pub fn manager(&self) -> &Arc<RpcManager> {
        &self.manager
    }

    /// Dispatch `method` with the manager's default options.
    pub async fn request<T>(&self, method: &str, params: Value) -> RpcResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        self.request_with(method, params, self.manager.options()).await
    }

    pub async fn request_with<T>(
        &self,
        method: &str,
        params: Value,
        options: DispatchOptions,
    ) -> RpcResult<T>
    where
        T: Serialize + DeserializeOwned,
    {
        let signature = CallSignature::new(method, &params);
        self.manager
            .dispatch(&signature, options, |endpoint| {
                let params = params.clone();
                async move { self.send(&endpoint, method, params).await }
            })
            .await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        endpoint: &Endpoint,
        method: &str,
        params: Value,
    ) -> RpcResult<T> {
        let body = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "method": method,
            "params": params,
        });
        debug!("{} via {}", method, endpoint);

        // Strip URLs from transport errors: they may carry API keys.
        let response = self
            .http
            .post(endpoint.url())
            .json(&body)
            .send()
            .await
            .map_err(|e| RpcError::from_reqwest(endpoint.label(), e.without_url()))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| RpcError::from_reqwest(endpoint.label(), e.without_url()))?;

        if !status.is_success() {
            return Err(RpcError::from_status(endpoint.label(), status.as_u16(), &text));
        }

        let envelope: JsonRpcResponse = serde_json::from_str(&text)?;
        envelope.into_result(endpoint.label())
    }

    /// Native balance in wei at the latest block.
    pub async fn get_balance(&self, address: &str) -> RpcResult<U256> {
        let address = abi::parse_address(address)?;
        let raw: String = self
            .request("eth_getBalance", json!([address, "latest"]))
            .await?;
        parse_quantity(&raw)
    }

    /// `eth_call` against `to` at the latest block, returning raw return data.
    pub async fn call_raw(&self, to: Address, data: Vec<u8>) -> RpcResult<Bytes> {
        self.request(
            "eth_call",
            json!([{ "to": to, "data": Bytes::from(data) }, "latest"]),
        )
        .await
    }

    /// Call a contract view function and decode its return value.
    pub async fn call<C: SolCall>(&self, to: Address, call: &C) -> RpcResult<C::Return> {
        let data = self.call_raw(to, call.abi_encode()).await?;
        abi::decode_returns::<C>(&data)
    }

    pub async fn chain_id(&self) -> RpcResult<u64> {
        let raw: String = self.request("eth_chainId", json!([])).await?;
        let id = parse_quantity(&raw)?;
        if id > U256::from(u64::MAX) {
            return Err(RpcError::Malformed(format!("chain id out of range: {}", raw)));
        }
        Ok(id.as_limbs()[0])
    }
}

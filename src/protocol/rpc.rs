//! Upstream node communication over JSON-RPC

use crate::config::UpstreamConfig;
use crate::core::codec::bytes_to_hex;
use crate::core::BlockTemplate;
use crate::error::{Error, Result};
use crate::protocol::retry::RetryPolicy;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use tracing::{debug, info, warn};

/// Capabilities advertised with `getblocktemplate`
const TEMPLATE_CAPABILITIES: [&str; 3] = ["coinbasetxn", "workid", "coinbase/append"];

/// Upstream node the proxy fetches templates from and submits blocks to
#[async_trait]
pub trait UpstreamRpc: Send + Sync {
    /// Name used in logs
    fn name(&self) -> &str;

    /// Fetch a fresh block template
    async fn get_block_template(&self) -> Result<BlockTemplate>;

    /// Submit a serialized block. `Ok(false)` means the node rejected it.
    async fn submit_block(&self, block: &[u8]) -> Result<bool>;
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    params: Value,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Value,
    #[serde(default)]
    error: Option<RpcError>,
}

#[derive(Debug, Deserialize)]
struct RpcError {
    code: i64,
    message: String,
}

/// JSON-RPC 1.0 client over HTTP with optional basic auth
pub struct JsonRpcClient {
    name: String,
    url: String,
    user: Option<String>,
    password: Option<String>,
    client: Client,
    retry: RetryPolicy,
    next_id: AtomicU64,
}

impl JsonRpcClient {
    /// Create a client for one configured upstream
    pub fn new(config: &UpstreamConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()?;

        info!("Created RPC client for upstream {} at {}", config.name, config.url);

        Ok(Self {
            name: config.name.clone(),
            url: config.url.clone(),
            user: config.user.clone(),
            password: config.password.clone(),
            client,
            retry: RetryPolicy::default(),
            next_id: AtomicU64::new(1),
        })
    }

    /// Replace the retry policy used for template fetches
    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Perform one JSON-RPC call (single attempt), returning the node's
    /// error object as an `Error::Rpc`
    async fn call(&self, method: &str, params: Value) -> Result<Value> {
        let response = self.exchange(method, params).await?;

        if let Some(error) = response.error {
            return Err(Error::rpc(
                &self.name,
                format!("{} failed ({}): {}", method, error.code, error.message),
            ));
        }

        Ok(response.result)
    }

    /// Send one request and parse the JSON-RPC envelope
    async fn exchange(&self, method: &str, params: Value) -> Result<RpcResponse> {
        let request = RpcRequest {
            jsonrpc: "1.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };

        debug!(upstream = %self.name, method, "Sending RPC request");

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(user) = &self.user {
            builder = builder.basic_auth(user, self.password.as_ref());
        }

        let response = builder.send().await?;
        let status = response.status();
        let body = response.text().await?;

        // Bitcoin-style nodes report RPC errors with a 500 status and a JSON body
        let parsed: RpcResponse = match serde_json::from_str(&body) {
            Ok(parsed) => parsed,
            Err(e) if status.is_success() => {
                return Err(Error::rpc(
                    &self.name,
                    format!("Invalid {} response: {}", method, e),
                ))
            }
            Err(_) => {
                return Err(Error::HttpStatus {
                    upstream: self.name.clone(),
                    status: status.as_u16(),
                })
            }
        };

        Ok(parsed)
    }
}

#[async_trait]
impl UpstreamRpc for JsonRpcClient {
    fn name(&self) -> &str {
        &self.name
    }

    async fn get_block_template(&self) -> Result<BlockTemplate> {
        let params = json!([{ "capabilities": TEMPLATE_CAPABILITIES }]);
        let result = self
            .retry
            .execute(|| self.call("getblocktemplate", params.clone()))
            .await?;

        serde_json::from_value(result)
            .map_err(|e| Error::malformed_template(format!("{}: {}", self.name, e)))
    }

    async fn submit_block(&self, block: &[u8]) -> Result<bool> {
        // a retried submission of an accepted block would come back as a duplicate
        let response = self
            .exchange("submitblock", json!([bytes_to_hex(block)]))
            .await?;

        if let Some(error) = response.error {
            warn!(
                upstream = %self.name,
                code = error.code,
                reason = %error.message,
                "Block refused by node"
            );
            return Ok(false);
        }

        match response.result {
            Value::Null => Ok(true),
            Value::String(reason) => {
                warn!(upstream = %self.name, %reason, "Block rejected by node");
                Ok(false)
            }
            other => {
                warn!(upstream = %self.name, result = %other, "Unexpected submitblock result");
                Ok(false)
            }
        }
    }
}

//! Divi node JSON-RPC client implementation

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use divi_core::{GatewayError, GatewayResult, MethodKind, NodeRpc};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::sync::Semaphore;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::credentials::Credentials;
use crate::types::{classify_body, RpcRequest};

/// Default request timeout
const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
/// Default connection timeout
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
/// Default extra attempts for idempotent calls
const DEFAULT_MAX_RETRIES: u32 = 2;
/// Default base delay between attempts
const DEFAULT_RETRY_BACKOFF: Duration = Duration::from_millis(100);
/// Default number of concurrent round trips to the node
const DEFAULT_POOL_SIZE: usize = 16;

/// Transport tuning for [`RpcClient`]
#[derive(Debug, Clone)]
pub struct RpcConfig {
    pub timeout: Duration,
    pub connect_timeout: Duration,
    /// Extra attempts allowed for idempotent methods
    pub max_retries: u32,
    /// Delay before the first retry; doubles on each subsequent retry
    pub retry_backoff: Duration,
    /// Maximum concurrent round trips, and idle keep-alive connections kept
    pub pool_size: usize,
}

impl Default for RpcConfig {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            max_retries: DEFAULT_MAX_RETRIES,
            retry_backoff: DEFAULT_RETRY_BACKOFF,
            pool_size: DEFAULT_POOL_SIZE,
        }
    }
}

/// Divi node RPC client
///
/// Cheap to clone: clones share the connection pool and the permit set
/// that bounds concurrent round trips.
#[derive(Debug, Clone)]
pub struct RpcClient {
    client: Client,
    url: Url,
    credentials: Arc<Credentials>,
    config: RpcConfig,
    permits: Arc<Semaphore>,
}

/// Positional params for Divi's address-index RPCs
fn address_params(address: &str, is_vault: bool) -> Vec<Value> {
    vec![json!({ "addresses": [address] }), json!(is_vault)]
}

fn classify_send_error(err: reqwest::Error) -> GatewayError {
    if err.is_timeout() {
        GatewayError::Timeout
    } else if err.is_decode() || err.is_body() {
        GatewayError::bad_response(format!("Failed to read node response: {}", err))
    } else {
        GatewayError::unreachable(format!("Node unreachable: {}", err))
    }
}

impl RpcClient {
    /// Create a client with default transport settings
    pub fn new(credentials: Credentials) -> GatewayResult<Self> {
        Self::with_config(credentials, RpcConfig::default())
    }

    /// Create a client with custom transport settings
    pub fn with_config(credentials: Credentials, config: RpcConfig) -> GatewayResult<Self> {
        let pool_size = config.pool_size.max(1);

        let client = Client::builder()
            .timeout(config.timeout)
            .connect_timeout(config.connect_timeout)
            .pool_max_idle_per_host(pool_size)
            .build()
            .map_err(|e| GatewayError::Configuration(format!("Failed to build HTTP client: {}", e)))?;

        let url = Url::parse(&format!("http://{}:{}/", credentials.host(), credentials.port()))
            .map_err(|e| {
                GatewayError::Configuration(format!(
                    "Invalid node address {}:{}: {}",
                    credentials.host(),
                    credentials.port(),
                    e
                ))
            })?;

        Ok(Self {
            client,
            url,
            credentials: Arc::new(credentials),
            config,
            permits: Arc::new(Semaphore::new(pool_size)),
        })
    }

    /// Node endpoint URL
    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn config(&self) -> &RpcConfig {
        &self.config
    }

    /// Execute one logical RPC call.
    ///
    /// Idempotent methods are retried with exponential backoff on transport
    /// failures and timeouts; node-level errors are returned immediately.
    /// Every other method gets exactly one attempt.
    #[instrument(skip(self, params))]
    pub async fn call(&self, method: &str, params: Vec<Value>) -> GatewayResult<Value> {
        let attempts = match MethodKind::of(method) {
            MethodKind::Idempotent => self.config.max_retries + 1,
            MethodKind::NonIdempotent => 1,
        };

        let mut attempt = 0;
        loop {
            match self.round_trip(method, &params).await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt + 1 < attempts => {
                    let delay = self
                        .config
                        .retry_backoff
                        .saturating_mul(1u32 << attempt.min(16));
                    warn!(attempt = attempt + 1, error = %e, ?delay, "Retrying idempotent RPC call");
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One HTTP exchange with the node. The pool permit is released when
    /// this returns, whatever the outcome.
    async fn round_trip(&self, method: &str, params: &[Value]) -> GatewayResult<Value> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| GatewayError::Internal("RPC connection pool closed".to_string()))?;

        let request = RpcRequest::new(method, params);
        debug!(id = %request.id, "Sending RPC request");

        let response = self
            .client
            .post(self.url.clone())
            .basic_auth(self.credentials.user(), Some(self.credentials.password()))
            .json(&request)
            .send()
            .await
            .map_err(classify_send_error)?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(GatewayError::Auth {
                status: status.as_u16(),
                message: format!("Node returned HTTP {}", status),
            });
        }

        let body = response.bytes().await.map_err(classify_send_error)?;
        debug!(id = %request.id, %status, bytes = body.len(), "RPC response received");
        classify_body(status, &body)
    }

    // =========================================================================
    // Chain
    // =========================================================================

    pub async fn get_block_count(&self) -> GatewayResult<Value> {
        self.call("getblockcount", vec![]).await
    }

    pub async fn get_block(&self, hash: &str, verbose: bool) -> GatewayResult<Value> {
        self.call("getblock", vec![json!(hash), json!(verbose)]).await
    }

    pub async fn get_block_hash(&self, height: u64) -> GatewayResult<Value> {
        self.call("getblockhash", vec![json!(height)]).await
    }

    pub async fn get_info(&self) -> GatewayResult<Value> {
        self.call("getinfo", vec![]).await
    }

    pub async fn get_connection_count(&self) -> GatewayResult<Value> {
        self.call("getconnectioncount", vec![]).await
    }

    // =========================================================================
    // Transactions
    // =========================================================================

    /// `verbose` is sent as 1/0; the node rejects booleans for this method
    pub async fn get_raw_transaction(&self, txid: &str, verbose: bool) -> GatewayResult<Value> {
        self.call(
            "getrawtransaction",
            vec![json!(txid), json!(if verbose { 1 } else { 0 })],
        )
        .await
    }

    pub async fn decode_raw_transaction(&self, hex: &str) -> GatewayResult<Value> {
        self.call("decoderawtransaction", vec![json!(hex)]).await
    }

    /// Broadcast a signed transaction.
    ///
    /// Attempted exactly once. The round trip runs on its own task so that
    /// dropping the caller's future (client disconnect) cannot abort a
    /// submission the node may already have accepted.
    pub async fn send_raw_transaction(
        &self,
        hex: &str,
        allow_high_fees: bool,
    ) -> GatewayResult<Value> {
        let client = self.clone();
        let params = vec![json!(hex), json!(allow_high_fees)];

        let handle = tokio::spawn(async move {
            let outcome = client.call("sendrawtransaction", params).await;
            match &outcome {
                Ok(txid) => info!(%txid, "Broadcast accepted by node"),
                Err(e) => warn!(error = %e, "Broadcast rejected or failed"),
            }
            outcome
        });

        handle
            .await
            .map_err(|e| GatewayError::Internal(format!("Broadcast task failed: {}", e)))?
    }

    // =========================================================================
    // Address index
    // =========================================================================

    pub async fn get_address_deltas(&self, address: &str, is_vault: bool) -> GatewayResult<Value> {
        self.call("getaddressdeltas", address_params(address, is_vault))
            .await
    }

    pub async fn get_address_txids(&self, address: &str, is_vault: bool) -> GatewayResult<Value> {
        self.call("getaddresstxids", address_params(address, is_vault))
            .await
    }
}

#[async_trait]
impl NodeRpc for RpcClient {
    async fn call(&self, method: &str, params: Vec<Value>) -> GatewayResult<Value> {
        RpcClient::call(self, method, params).await
    }
}

//! End-to-end tests for the Divi gateway
//!
//! Each test starts a scripted mock node and an in-process gateway on
//! ephemeral ports, then talks to the gateway over real HTTP.
//!
//! ```bash
//! cargo test -p divi-tests
//! ```

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use divi_api::{create_router, AppState};
use divi_gateway::VaultClassifier;
use divi_rpc::testing::MockNode;
use divi_rpc::{RpcClient, RpcConfig};
use serde_json::Value;
use tokio::net::TcpListener;

/// A mock node plus a gateway pointed at it
pub struct TestGateway {
    pub node: MockNode,
    pub addr: SocketAddr,
    http: reqwest::Client,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

fn fast_config() -> RpcConfig {
    RpcConfig {
        timeout: Duration::from_secs(2),
        connect_timeout: Duration::from_secs(1),
        max_retries: 2,
        retry_backoff: Duration::from_millis(10),
        pool_size: 4,
    }
}

impl TestGateway {
    pub async fn start() -> std::io::Result<Self> {
        Self::start_with(fast_config(), None).await
    }

    pub async fn start_with_config(config: RpcConfig) -> std::io::Result<Self> {
        Self::start_with(config, None).await
    }

    /// Gateway classifying vault outputs with `classifier`
    pub async fn start_with_classifier(classifier: Arc<dyn VaultClassifier>) -> std::io::Result<Self> {
        Self::start_with(fast_config(), Some(classifier)).await
    }

    async fn start_with(
        config: RpcConfig,
        classifier: Option<Arc<dyn VaultClassifier>>,
    ) -> std::io::Result<Self> {
        let node = MockNode::start().await?;
        let rpc = RpcClient::with_config(node.credentials(), config)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e.to_string()))?;
        let state = match classifier {
            Some(classifier) => AppState::with_classifier(rpc, classifier),
            None => AppState::new(rpc),
        };
        let router = create_router(state);

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            node,
            addr,
            http: reqwest::Client::new(),
            shutdown_tx: Some(shutdown_tx),
        })
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// GET `path`, returning status and JSON body
    pub async fn get(&self, path: &str) -> reqwest::Result<(u16, Value)> {
        let response = self.http.get(self.url(path)).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    /// POST without a body, returning status and JSON body
    pub async fn post_empty(&self, path: &str) -> reqwest::Result<(u16, Value)> {
        let response = self.http.post(self.url(path)).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }

    /// POST a JSON body to `path`, returning status and JSON body
    pub async fn post(&self, path: &str, body: &Value) -> reqwest::Result<(u16, Value)> {
        let response = self.http.post(self.url(path)).json(body).send().await?;
        let status = response.status().as_u16();
        Ok((status, response.json().await?))
    }
}

impl Drop for TestGateway {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
    }
}

//! Test utilities for divi-rpc
//!
//! [`MockNode`] is a scripted JSON-RPC endpoint that behaves like a Divi
//! node over HTTP, recording every call it receives.

use std::collections::{HashMap, VecDeque};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::Router;
use parking_lot::Mutex;
use serde_json::{json, Value};
use tokio::net::TcpListener;

use crate::credentials::Credentials;

/// How the mock node answers one call
#[derive(Debug, Clone)]
pub enum MockReply {
    /// HTTP 200 with `{"result": value, "error": null}`
    Result(Value),
    /// HTTP 500 with a JSON-RPC error object, as bitcoind-derived nodes do
    Error { code: i64, message: String },
    /// Bare HTTP status with a plain-text body
    Status(u16, String),
    /// HTTP 200 with a body that is not JSON
    Garbage(String),
    /// Wait, then answer
    Delay(Duration, Box<MockReply>),
}

impl MockReply {
    pub fn error(code: i64, message: impl Into<String>) -> Self {
        Self::Error {
            code,
            message: message.into(),
        }
    }

    pub fn delayed(delay: Duration, reply: MockReply) -> Self {
        Self::Delay(delay, Box::new(reply))
    }
}

/// A call received by the mock node
#[derive(Debug, Clone)]
pub struct RecordedCall {
    pub method: String,
    pub params: Vec<Value>,
    pub authorization: Option<String>,
}

#[derive(Default)]
struct Script {
    /// One-shot replies, consumed before the standing reply
    queued: HashMap<String, VecDeque<MockReply>>,
    /// Standing reply per method
    standing: HashMap<String, MockReply>,
    calls: Vec<RecordedCall>,
    /// Methods whose reply was fully rendered, in completion order
    answered: Vec<String>,
}

impl Script {
    fn next_reply(&mut self, method: &str) -> Option<MockReply> {
        if let Some(reply) = self.queued.get_mut(method).and_then(|q| q.pop_front()) {
            return Some(reply);
        }
        self.standing.get(method).cloned()
    }
}

type SharedScript = Arc<Mutex<Script>>;

/// A mock node that shuts down when dropped
pub struct MockNode {
    pub addr: SocketAddr,
    script: SharedScript,
    shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
    handle: Option<tokio::task::JoinHandle<()>>,
}

impl MockNode {
    /// Start a mock node on an ephemeral loopback port
    pub async fn start() -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;

        let script: SharedScript = Arc::new(Mutex::new(Script::default()));
        let router = Router::new()
            .route("/", post(handle_rpc))
            .with_state(script.clone());

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel();
        let handle = tokio::spawn(async move {
            axum::serve(listener, router)
                .with_graceful_shutdown(async {
                    let _ = shutdown_rx.await;
                })
                .await
                .ok();
        });

        Ok(Self {
            addr,
            script,
            shutdown_tx: Some(shutdown_tx),
            handle: Some(handle),
        })
    }

    /// Credentials pointing at this node (user `foo`, password `bar`)
    pub fn credentials(&self) -> Credentials {
        Credentials::new("foo", "bar")
            .with_host(self.addr.ip().to_string())
            .with_port(self.addr.port())
    }

    /// Answer every call to `method` with `reply`
    pub fn respond(&self, method: &str, reply: MockReply) {
        self.script.lock().standing.insert(method.to_string(), reply);
    }

    /// Answer the next call to `method` with `reply`, ahead of the standing reply
    pub fn enqueue(&self, method: &str, reply: MockReply) {
        self.script
            .lock()
            .queued
            .entry(method.to_string())
            .or_default()
            .push_back(reply);
    }

    /// All calls received so far
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.script.lock().calls.clone()
    }

    /// Number of calls received for `method`
    pub fn call_count(&self, method: &str) -> usize {
        self.script
            .lock()
            .calls
            .iter()
            .filter(|c| c.method == method)
            .count()
    }

    /// Number of calls to `method` the node finished answering.
    /// A call whose handler was cancelled midway is not counted.
    pub fn answered_count(&self, method: &str) -> usize {
        self.script
            .lock()
            .answered
            .iter()
            .filter(|m| m.as_str() == method)
            .count()
    }

    /// Shutdown the node gracefully
    pub async fn shutdown(mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for MockNode {
    fn drop(&mut self) {
        if let Some(tx) = self.shutdown_tx.take() {
            let _ = tx.send(());
        }
        if let Some(handle) = self.handle.take() {
            handle.abort();
        }
    }
}

async fn handle_rpc(State(script): State<SharedScript>, headers: HeaderMap, body: Bytes) -> Response {
    let request: Value = match serde_json::from_slice(&body) {
        Ok(v) => v,
        Err(_) => return (StatusCode::BAD_REQUEST, "invalid JSON").into_response(),
    };

    let method = request["method"].as_str().unwrap_or_default().to_string();
    let params = request["params"].as_array().cloned().unwrap_or_default();
    let id = request["id"].clone();
    let authorization = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    let reply = {
        let mut script = script.lock();
        script.calls.push(RecordedCall {
            method: method.clone(),
            params,
            authorization,
        });
        script.next_reply(&method)
    };

    let reply = reply.unwrap_or_else(|| MockReply::error(-32601, "Method not found"));
    let response = render(reply, id).await;
    script.lock().answered.push(method);
    response
}

async fn render(mut reply: MockReply, id: Value) -> Response {
    let reply = loop {
        match reply {
            MockReply::Delay(delay, inner) => {
                tokio::time::sleep(delay).await;
                reply = *inner;
            }
            other => break other,
        }
    };

    match reply {
        MockReply::Result(result) => (
            StatusCode::OK,
            axum::Json(json!({ "result": result, "error": null, "id": id })),
        )
            .into_response(),
        MockReply::Error { code, message } => (
            StatusCode::INTERNAL_SERVER_ERROR,
            axum::Json(json!({
                "result": null,
                "error": { "code": code, "message": message },
                "id": id
            })),
        )
            .into_response(),
        MockReply::Status(status, body) => (
            StatusCode::from_u16(status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR),
            body,
        )
            .into_response(),
        MockReply::Garbage(body) => (StatusCode::OK, body).into_response(),
        MockReply::Delay(..) => unreachable!(), // unwrapped by the loop above
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_queued_reply_precedes_standing_reply() {
        let node = MockNode::start().await.unwrap();
        node.respond("getblockcount", MockReply::Result(json!(1)));
        node.enqueue("getblockcount", MockReply::Result(json!(2)));

        let mut script = node.script.lock();
        assert!(matches!(script.next_reply("getblockcount"), Some(MockReply::Result(v)) if v == json!(2)));
        assert!(matches!(script.next_reply("getblockcount"), Some(MockReply::Result(v)) if v == json!(1)));
        assert!(script.next_reply("getinfo").is_none());
    }
}

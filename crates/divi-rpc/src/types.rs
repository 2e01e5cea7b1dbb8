//! JSON-RPC wire types

use divi_core::{GatewayError, GatewayResult};
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Request body sent to the node
#[derive(Debug, Serialize)]
pub struct RpcRequest<'a> {
    pub jsonrpc: &'static str,
    /// Correlation token, echoed back by the node
    pub id: String,
    pub method: &'a str,
    pub params: &'a [Value],
}

impl<'a> RpcRequest<'a> {
    pub fn new(method: &'a str, params: &'a [Value]) -> Self {
        Self {
            jsonrpc: "1.0",
            id: Uuid::new_v4().to_string(),
            method,
            params,
        }
    }
}

/// Error object carried in a node response
#[derive(Debug, Clone, Deserialize)]
pub struct RpcErrorObject {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

/// Response envelope returned by the node
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    #[serde(default)]
    pub result: Value,
    #[serde(default)]
    pub error: Option<RpcErrorObject>,
    #[serde(default)]
    pub id: Value,
}

/// Classify a node HTTP response body.
///
/// Nodes report RPC errors with HTTP 500/404 and a JSON envelope, so the
/// body is inspected whatever the status. Authentication statuses are
/// handled before this is called.
pub fn classify_body(status: StatusCode, body: &[u8]) -> GatewayResult<Value> {
    let parsed: Value = match serde_json::from_slice(body) {
        Ok(value) => value,
        Err(e) => {
            return Err(if status.is_success() {
                GatewayError::bad_response(format!("Malformed JSON-RPC response: {}", e))
            } else {
                GatewayError::bad_response(format!("HTTP {} from node with non-JSON body", status))
            });
        }
    };

    if !parsed.is_object() {
        return Err(GatewayError::bad_response(
            "JSON-RPC response is not an object",
        ));
    }

    let has_result = parsed.get("result").is_some();
    let envelope: RpcResponse = serde_json::from_value(parsed).map_err(|e| {
        GatewayError::bad_response(format!("Malformed JSON-RPC envelope: {}", e))
    })?;

    if let Some(err) = envelope.error {
        return Err(GatewayError::NodeRpc {
            code: err.code,
            message: err.message,
        });
    }

    if !status.is_success() {
        return Err(GatewayError::bad_response(format!(
            "HTTP {} from node without an error object",
            status
        )));
    }

    if !has_result {
        return Err(GatewayError::bad_response("JSON-RPC response has no result"));
    }

    Ok(envelope.result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn success_returns_result() {
        let body = br#"{"result":12345,"error":null,"id":1}"#;
        assert_eq!(classify_body(StatusCode::OK, body).unwrap(), json!(12345));
    }

    #[test]
    fn error_object_on_500_is_node_error() {
        let body = br#"{"result":null,"error":{"code":-5,"message":"No such transaction"},"id":1}"#;
        match classify_body(StatusCode::INTERNAL_SERVER_ERROR, body).unwrap_err() {
            GatewayError::NodeRpc { code, message } => {
                assert_eq!(code, -5);
                assert_eq!(message, "No such transaction");
            }
            other => panic!("Expected NodeRpc, got {:?}", other),
        }
    }

    #[test]
    fn non_json_is_transport_error() {
        let err = classify_body(StatusCode::OK, b"<html>proxy</html>").unwrap_err();
        assert!(matches!(err, GatewayError::Transport { unreachable: false, .. }));
    }

    #[test]
    fn non_object_is_transport_error() {
        let err = classify_body(StatusCode::OK, b"[1,2,3]").unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }

    #[test]
    fn server_error_without_envelope_error_is_transport() {
        let err = classify_body(StatusCode::BAD_GATEWAY, br#"{"result":null}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }

    #[test]
    fn missing_result_is_transport_error() {
        let err = classify_body(StatusCode::OK, br#"{"id":1}"#).unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
        assert_eq!(
            classify_body(StatusCode::OK, br#"{"result":null,"error":null}"#).unwrap(),
            Value::Null
        );
    }

    #[test]
    fn request_serializes_positional_params() {
        let params = [json!("abc"), json!(1)];
        let req = RpcRequest::new("getrawtransaction", &params);
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["method"], "getrawtransaction");
        assert_eq!(value["params"], json!(["abc", 1]));
        assert!(value["id"].is_string());
    }
}

//! API error types and conversions
//!
//! Every failure leaves the gateway through [`ApiError`], which renders
//! the stable error shape `{httpStatus, code, message, nodeDetail?}`.
//! Node error codes and messages are kept verbatim in `nodeDetail` for
//! operators; the primary message is always the gateway's own.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use divi_core::GatewayError;
use serde::Serialize;

/// API error type that converts to HTTP responses
#[derive(Debug)]
pub enum ApiError {
    /// Any classified gateway failure
    Gateway(GatewayError),
    /// 404 Not Found (no such route)
    NotFound(String),
}

/// Standard error response format
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    http_status: u16,
    code: String,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    node_detail: Option<NodeDetail>,
}

/// Original node error, preserved for diagnosis
#[derive(Serialize)]
struct NodeDetail {
    code: i64,
    message: String,
}

fn user_message(err: &GatewayError) -> String {
    match err {
        GatewayError::Validation(msg) => msg.clone(),
        GatewayError::Configuration(_) => "Gateway is not configured to reach the node".to_string(),
        GatewayError::Auth { .. } => "Gateway credentials were rejected by the node".to_string(),
        GatewayError::NodeRpc { .. } => "The node rejected the request".to_string(),
        GatewayError::Transport {
            unreachable: true, ..
        } => "Service Unavailable. Try again later.".to_string(),
        GatewayError::Transport { .. } => "The node returned an invalid response".to_string(),
        GatewayError::Timeout => {
            "Request Timeout. Service took too long to respond. Try again later.".to_string()
        }
        GatewayError::Internal(_) => "Internal gateway error".to_string(),
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::NotFound(msg) => (
                StatusCode::NOT_FOUND,
                ErrorResponse {
                    http_status: 404,
                    code: "not_found".to_string(),
                    message: msg,
                    node_detail: None,
                },
            ),
            ApiError::Gateway(err) => {
                let status = StatusCode::from_u16(err.status_code())
                    .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

                // Log errors at appropriate levels, with the full detail
                if status.is_server_error() {
                    tracing::error!(error = err.kind(), detail = %err, "API error");
                } else {
                    tracing::debug!(error = err.kind(), detail = %err, "API client error");
                }

                let node_detail = match &err {
                    GatewayError::NodeRpc { code, message } => Some(NodeDetail {
                        code: *code,
                        message: message.clone(),
                    }),
                    _ => None,
                };

                (
                    status,
                    ErrorResponse {
                        http_status: status.as_u16(),
                        code: err.kind().to_string(),
                        message: user_message(&err),
                        node_detail,
                    },
                )
            }
        };

        (status, Json(body)).into_response()
    }
}

impl From<GatewayError> for ApiError {
    fn from(err: GatewayError) -> Self {
        ApiError::Gateway(err)
    }
}

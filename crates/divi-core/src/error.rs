//! Gateway error taxonomy

use thiserror::Error;

/// Result type for gateway operations
pub type GatewayResult<T> = Result<T, GatewayError>;

/// Errors that can occur anywhere between the inbound request and the node
#[derive(Debug, Clone, Error)]
pub enum GatewayError {
    /// Credentials or gateway configuration could not be resolved (startup only)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Caller-supplied input is malformed; raised before any node call
    #[error("Invalid request: {0}")]
    Validation(String),

    /// The node rejected our credentials
    #[error("Node rejected credentials (HTTP {status}): {message}")]
    Auth { status: u16, message: String },

    /// The node understood the request and returned a JSON-RPC error object
    #[error("Node RPC error {code}: {message}")]
    NodeRpc { code: i64, message: String },

    /// The node could not be reached, or its response could not be parsed
    #[error("Transport error: {message}")]
    Transport {
        message: String,
        /// True when no HTTP exchange happened at all (refused, reset, DNS)
        unreachable: bool,
    },

    /// Deadline exceeded waiting for the node
    #[error("Node request timed out")]
    Timeout,

    /// Fault inside the gateway itself
    #[error("Internal error: {0}")]
    Internal(String),
}

impl GatewayError {
    /// Transport failure where the node was never reached
    pub fn unreachable(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            unreachable: true,
        }
    }

    /// Transport failure where the node answered with something unusable
    pub fn bad_response(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
            unreachable: false,
        }
    }

    /// Whether an idempotent call may be re-attempted after this error.
    ///
    /// A node-level rejection is definitive and is never retried.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::Timeout)
    }

    /// Returns the HTTP status code for this error
    pub fn status_code(&self) -> u16 {
        match self {
            GatewayError::Configuration(_) => 403,
            GatewayError::Validation(_) => 400,
            GatewayError::Auth { status, .. } => {
                if *status == 403 {
                    403
                } else {
                    401
                }
            }
            GatewayError::NodeRpc { .. } => 502,
            GatewayError::Transport { unreachable, .. } => {
                if *unreachable {
                    503
                } else {
                    502
                }
            }
            GatewayError::Timeout => 504,
            GatewayError::Internal(_) => 500,
        }
    }

    /// Stable machine-readable error code
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::Configuration(_) => "configuration_error",
            GatewayError::Validation(_) => "validation_error",
            GatewayError::Auth { .. } => "auth_error",
            GatewayError::NodeRpc { .. } => "node_rpc_error",
            GatewayError::Transport { .. } => "transport_error",
            GatewayError::Timeout => "timeout_error",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(GatewayError::Validation("bad".into()).status_code(), 400);
        assert_eq!(GatewayError::Configuration("x".into()).status_code(), 403);
        assert_eq!(
            GatewayError::Auth {
                status: 401,
                message: String::new()
            }
            .status_code(),
            401
        );
        assert_eq!(
            GatewayError::Auth {
                status: 403,
                message: String::new()
            }
            .status_code(),
            403
        );
        assert_eq!(
            GatewayError::NodeRpc {
                code: -5,
                message: "No such transaction".into()
            }
            .status_code(),
            502
        );
        assert_eq!(GatewayError::unreachable("refused").status_code(), 503);
        assert_eq!(GatewayError::bad_response("not json").status_code(), 502);
        assert_eq!(GatewayError::Timeout.status_code(), 504);
    }

    #[test]
    fn test_only_transport_and_timeout_are_retryable() {
        assert!(GatewayError::Timeout.is_retryable());
        assert!(GatewayError::unreachable("reset").is_retryable());
        assert!(GatewayError::bad_response("garbage").is_retryable());
        assert!(!GatewayError::NodeRpc {
            code: -25,
            message: "missing inputs".into()
        }
        .is_retryable());
        assert!(!GatewayError::Auth {
            status: 401,
            message: String::new()
        }
        .is_retryable());
        assert!(!GatewayError::Validation("x".into()).is_retryable());
    }
}

//! HTTP request handlers for the gateway API
//!
//! Handlers validate their inputs before touching the node and delegate to
//! either the RPC client (passthrough resources) or the aggregation
//! service (derived resources).

pub mod address;
pub mod blocks;
pub mod chain;
pub mod mempool;
pub mod transactions;

use divi_core::GatewayError;

use crate::error::ApiError;

/// Parse a non-negative integer path or query value
pub(crate) fn parse_height(name: &str, value: &str) -> Result<u64, ApiError> {
    value.trim().parse::<u64>().map_err(|_| {
        ApiError::from(GatewayError::Validation(format!(
            "Invalid {} '{}': expected a non-negative integer",
            name, value
        )))
    })
}

/// Fallback for unknown routes
pub async fn not_found() -> ApiError {
    ApiError::NotFound("No such resource".to_string())
}

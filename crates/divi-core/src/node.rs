//! NodeRpc trait - the seam between the gateway and a Divi node

use async_trait::async_trait;
use serde_json::Value;

use crate::error::GatewayResult;

/// Methods that only read node state and may be safely re-issued.
const IDEMPOTENT_METHODS: &[&str] = &[
    "getblockcount",
    "getblock",
    "getblockhash",
    "getinfo",
    "getrawtransaction",
    "decoderawtransaction",
    "getconnectioncount",
    "getaddressbalance",
    "getaddressdeltas",
    "getaddresstxids",
    "getaddressutxos",
    "getaddressmempool",
    "getrawmempool",
    "getmempoolinfo",
    "getlotteryblockwinners",
];

/// Retry classification of an RPC method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodKind {
    /// Read-only; may be retried on transport failure or timeout
    Idempotent,
    /// Anything else. Attempted exactly once.
    NonIdempotent,
}

impl MethodKind {
    /// Classify a method by name. Unknown methods are never retried.
    pub fn of(method: &str) -> Self {
        if is_idempotent(method) {
            MethodKind::Idempotent
        } else {
            MethodKind::NonIdempotent
        }
    }
}

/// Whether `method` is on the read-only allow list
pub fn is_idempotent(method: &str) -> bool {
    IDEMPOTENT_METHODS.contains(&method)
}

/// A connection to a node that executes one logical JSON-RPC call.
///
/// Implementations handle framing, authentication and classification of
/// failures into [`GatewayError`](crate::GatewayError) kinds. Callers see
/// retries only as added latency.
#[async_trait]
pub trait NodeRpc: Send + Sync {
    /// Execute `method` with positional `params` and return the raw result.
    async fn call(&self, method: &str, params: Vec<Value>) -> GatewayResult<Value>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn broadcast_is_never_idempotent() {
        assert_eq!(MethodKind::of("sendrawtransaction"), MethodKind::NonIdempotent);
    }

    #[test]
    fn unknown_methods_are_not_retried() {
        assert_eq!(MethodKind::of("stop"), MethodKind::NonIdempotent);
        assert_eq!(MethodKind::of("GETBLOCKCOUNT"), MethodKind::NonIdempotent);
    }

    #[test]
    fn lookups_are_idempotent() {
        for method in ["getblockcount", "getblock", "getrawtransaction", "getaddressutxos"] {
            assert_eq!(MethodKind::of(method), MethodKind::Idempotent, "{}", method);
        }
    }
}

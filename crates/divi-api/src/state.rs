//! Application state for the gateway API

use std::sync::Arc;

use divi_gateway::{AggregationService, VaultClassifier};
use divi_rpc::RpcClient;

/// Application state shared across all handlers.
///
/// Holds only the node client (immutable credentials plus the shared
/// connection pool) and the aggregation service built on top of it.
#[derive(Clone)]
pub struct AppState {
    rpc: RpcClient,
    aggregation: AggregationService,
}

impl AppState {
    /// Create state over `rpc` using the node's vault listing parameter
    pub fn new(rpc: RpcClient) -> Self {
        let aggregation = AggregationService::new(Arc::new(rpc.clone()));
        Self { rpc, aggregation }
    }

    /// Create state with a custom vault classification rule
    pub fn with_classifier(rpc: RpcClient, classifier: Arc<dyn VaultClassifier>) -> Self {
        let aggregation = AggregationService::new(Arc::new(rpc.clone())).with_classifier(classifier);
        Self { rpc, aggregation }
    }

    /// Node client for passthrough resources
    pub fn rpc(&self) -> &RpcClient {
        &self.rpc
    }

    /// Aggregation service for derived resources
    pub fn aggregation(&self) -> &AggregationService {
        &self.aggregation
    }
}

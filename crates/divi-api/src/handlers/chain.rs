//! Chain status handlers

use axum::extract::State;
use axum::Json;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct PongResponse {
    pub message: &'static str,
}

#[derive(Serialize)]
pub struct BlockCountResponse {
    pub blockcount: Value,
}

#[derive(Serialize)]
pub struct ConnectionCountResponse {
    pub connections: Value,
}

/// GET /ping
/// Liveness check; does not contact the node
pub async fn ping() -> Json<PongResponse> {
    Json(PongResponse { message: "pong" })
}

/// GET /blockcount
pub async fn block_count(State(state): State<AppState>) -> Result<Json<BlockCountResponse>, ApiError> {
    let blockcount = state.rpc().get_block_count().await?;
    Ok(Json(BlockCountResponse { blockcount }))
}

/// GET /info
pub async fn info(State(state): State<AppState>) -> Result<Json<Value>, ApiError> {
    Ok(Json(state.rpc().get_info().await?))
}

/// GET /connectioncount
pub async fn connection_count(
    State(state): State<AppState>,
) -> Result<Json<ConnectionCountResponse>, ApiError> {
    let connections = state.rpc().get_connection_count().await?;
    Ok(Json(ConnectionCountResponse { connections }))
}

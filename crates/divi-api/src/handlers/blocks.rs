//! Block lookup handlers

use axum::extract::{Path, State};
use axum::Json;
use divi_core::validate;
use serde::Serialize;
use serde_json::Value;

use super::parse_height;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
pub struct BlockHashResponse {
    pub height: u64,
    pub hash: Value,
}

/// GET /block/{hash}
pub async fn get_block(
    State(state): State<AppState>,
    Path(hash): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate::block_hash(&hash)?;
    Ok(Json(state.rpc().get_block(&hash, true).await?))
}

/// GET /blockhash/{height}
pub async fn get_block_hash(
    State(state): State<AppState>,
    Path(height): Path<String>,
) -> Result<Json<BlockHashResponse>, ApiError> {
    let height = parse_height("block height", &height)?;
    let hash = state.rpc().get_block_hash(height).await?;
    Ok(Json(BlockHashResponse { height, hash }))
}

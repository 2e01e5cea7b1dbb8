//! Mempool and lottery handlers
//!
//! Both reshape node results so field renames between node releases do
//! not reach clients.

use axum::extract::{Query, State};
use axum::Json;
use divi_core::{LotterySummary, MempoolSummary, RawMempool};
use serde::Deserialize;

use super::parse_height;
use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct LotteryQuery {
    /// Kept as text so a malformed value gets the gateway's error shape
    pub blockheight: Option<String>,
}

/// GET /getrawmempool
pub async fn get_raw_mempool(State(state): State<AppState>) -> Result<Json<RawMempool>, ApiError> {
    Ok(Json(state.aggregation().raw_mempool().await?))
}

/// GET /getmempoolinfo
pub async fn get_mempool_info(
    State(state): State<AppState>,
) -> Result<Json<MempoolSummary>, ApiError> {
    Ok(Json(state.aggregation().mempool_summary().await?))
}

/// GET /getlottery?blockheight=N
/// Current candidates when no height is given
pub async fn get_lottery(
    State(state): State<AppState>,
    Query(query): Query<LotteryQuery>,
) -> Result<Json<LotterySummary>, ApiError> {
    let height = query
        .blockheight
        .as_deref()
        .map(|h| parse_height("blockheight", h))
        .transpose()?;
    Ok(Json(state.aggregation().lottery(height).await?))
}

//! Address handlers
//!
//! `isVault` selects vault owner key lookups. Balance, UTXO and history
//! resources are assembled by the aggregation service; deltas and txids
//! pass through.

use axum::extract::{Path, State};
use axum::Json;
use divi_core::{validate, BalanceView, TransactionSummary, Utxo};
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UtxoListResponse {
    pub address: String,
    pub is_vault: bool,
    pub utxos: Vec<Utxo>,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HistoryResponse {
    pub address: String,
    pub is_vault: bool,
    pub transactions: Vec<TransactionSummary>,
}

fn address_args(address: &str, is_vault: &str) -> Result<bool, ApiError> {
    validate::address(address)?;
    Ok(validate::vault_flag(is_vault)?)
}

/// GET /getaddressbalance/{address}/{isVault}
pub async fn get_address_balance(
    State(state): State<AppState>,
    Path((address, is_vault)): Path<(String, String)>,
) -> Result<Json<BalanceView>, ApiError> {
    let is_vault = address_args(&address, &is_vault)?;
    Ok(Json(state.aggregation().balance(&address, is_vault).await?))
}

/// GET /getaddressutxos/{address}/{isVault}
pub async fn get_address_utxos(
    State(state): State<AppState>,
    Path((address, is_vault)): Path<(String, String)>,
) -> Result<Json<UtxoListResponse>, ApiError> {
    let is_vault = address_args(&address, &is_vault)?;
    let utxos = state.aggregation().utxos(&address, is_vault).await?;
    Ok(Json(UtxoListResponse {
        address,
        is_vault,
        utxos,
    }))
}

/// GET /history/{address}/{isVault}
pub async fn get_address_history(
    State(state): State<AppState>,
    Path((address, is_vault)): Path<(String, String)>,
) -> Result<Json<HistoryResponse>, ApiError> {
    let is_vault = address_args(&address, &is_vault)?;
    let transactions = state.aggregation().history(&address, is_vault).await?;
    Ok(Json(HistoryResponse {
        address,
        is_vault,
        transactions,
    }))
}

/// GET /getaddressdeltas/{address}/{isVault}
pub async fn get_address_deltas(
    State(state): State<AppState>,
    Path((address, is_vault)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let is_vault = address_args(&address, &is_vault)?;
    Ok(Json(state.rpc().get_address_deltas(&address, is_vault).await?))
}

/// GET /getaddresstxids/{address}/{isVault}
pub async fn get_address_txids(
    State(state): State<AppState>,
    Path((address, is_vault)): Path<(String, String)>,
) -> Result<Json<Value>, ApiError> {
    let is_vault = address_args(&address, &is_vault)?;
    Ok(Json(state.rpc().get_address_txids(&address, is_vault).await?))
}

//! Transaction handlers

use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::Json;
use divi_core::{validate, GatewayError};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct SendRawTransactionRequest {
    pub hexstring: String,
    #[serde(default)]
    pub allowhighfees: bool,
}

#[derive(Serialize)]
pub struct SendRawTransactionResponse {
    pub txid: Value,
}

/// GET /tx/{txid}
pub async fn get_transaction(
    State(state): State<AppState>,
    Path(txid): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate::txid(&txid)?;
    Ok(Json(state.rpc().get_raw_transaction(&txid, true).await?))
}

/// GET /decode-raw-tx/{hex}
pub async fn decode_raw_transaction(
    State(state): State<AppState>,
    Path(hex): Path<String>,
) -> Result<Json<Value>, ApiError> {
    validate::raw_transaction(&hex)?;
    Ok(Json(state.rpc().decode_raw_transaction(&hex).await?))
}

/// Query-string form of the broadcast request, as sent by clients of the
/// earlier gateway
#[derive(Debug, Default, Deserialize)]
pub struct SendRawTransactionQuery {
    pub hexstring: Option<String>,
    pub allowhighfees: Option<bool>,
}

fn invalid_request(detail: String) -> ApiError {
    ApiError::from(GatewayError::Validation(format!("Invalid request: {}", detail)))
}

/// POST /sendrawtransaction
///
/// Takes `{"hexstring", "allowhighfees"?}` as a JSON body, or the same
/// fields as query parameters when no JSON body is sent. Issues exactly
/// one node call. Failures are returned as-is; resubmission is the
/// caller's decision.
pub async fn send_raw_transaction(
    State(state): State<AppState>,
    query: Result<Query<SendRawTransactionQuery>, QueryRejection>,
    body: Result<Json<SendRawTransactionRequest>, JsonRejection>,
) -> Result<Json<SendRawTransactionResponse>, ApiError> {
    let Query(query) = query.map_err(|e| invalid_request(e.body_text()))?;

    let request = match (body, query.hexstring) {
        (Ok(Json(request)), _) => request,
        (Err(_), Some(hexstring)) => SendRawTransactionRequest {
            hexstring,
            allowhighfees: query.allowhighfees.unwrap_or(false),
        },
        (Err(rejection), None) => return Err(invalid_request(rejection.body_text())),
    };
    validate::raw_transaction(&request.hexstring)?;

    let txid = state
        .rpc()
        .send_raw_transaction(&request.hexstring, request.allowhighfees)
        .await?;
    Ok(Json(SendRawTransactionResponse { txid }))
}

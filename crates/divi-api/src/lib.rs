//! divi-api - REST API layer for the Divi node gateway
//!
//! Maps REST resources onto node RPC calls and aggregated views. All
//! failures are rendered through [`ApiError`].
//!
//! # Usage
//!
//! ```ignore
//! use divi_api::{create_router, AppState};
//! use divi_rpc::{CredentialResolver, RpcClient};
//!
//! let credentials = CredentialResolver::new().resolve()?;
//! let state = AppState::new(RpcClient::new(credentials)?);
//! let router = create_router(state);
//! ```

pub mod error;
pub mod handlers;
pub mod state;

pub use error::ApiError;
pub use state::AppState;

use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

/// Create the gateway REST router with the given application state
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        // Health check
        .route("/ping", get(handlers::chain::ping))
        // Chain
        .route("/blockcount", get(handlers::chain::block_count))
        .route("/info", get(handlers::chain::info))
        .route("/connectioncount", get(handlers::chain::connection_count))
        .route("/block/{hash}", get(handlers::blocks::get_block))
        .route("/blockhash/{height}", get(handlers::blocks::get_block_hash))
        // Transactions
        .route("/tx/{txid}", get(handlers::transactions::get_transaction))
        .route(
            "/decode-raw-tx/{hex}",
            get(handlers::transactions::decode_raw_transaction),
        )
        .route(
            "/sendrawtransaction",
            post(handlers::transactions::send_raw_transaction),
        )
        // Address index
        .route(
            "/getaddressbalance/{address}/{is_vault}",
            get(handlers::address::get_address_balance),
        )
        .route(
            "/getaddressutxos/{address}/{is_vault}",
            get(handlers::address::get_address_utxos),
        )
        .route(
            "/getaddressdeltas/{address}/{is_vault}",
            get(handlers::address::get_address_deltas),
        )
        .route(
            "/getaddresstxids/{address}/{is_vault}",
            get(handlers::address::get_address_txids),
        )
        .route(
            "/history/{address}/{is_vault}",
            get(handlers::address::get_address_history),
        )
        // Mempool and lottery
        .route("/getrawmempool", get(handlers::mempool::get_raw_mempool))
        .route("/getmempoolinfo", get(handlers::mempool::get_mempool_info))
        .route("/getlottery", get(handlers::mempool::get_lottery))
        .fallback(handlers::not_found)
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

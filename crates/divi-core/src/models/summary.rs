//! Version-stable shapes for mempool and lottery resources
//!
//! Node releases have renamed fields in these results; the gateway always
//! serializes these structs instead of forwarding the node's object.

use serde::Serialize;

/// Mempool statistics
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MempoolSummary {
    /// Number of transactions
    pub size: u64,
    /// Sum of serialized transaction sizes
    pub bytes: u64,
    /// Memory used by the mempool, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub usage: Option<u64>,
}

/// Transaction ids currently in the mempool
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RawMempool {
    pub count: usize,
    pub txids: Vec<String>,
}

/// Lottery candidates or winners for a block
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotterySummary {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub block_height: Option<u64>,
    pub winners: Vec<LotteryWinner>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LotteryWinner {
    pub address: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rank: Option<u32>,
    /// Payout amount in DIVI, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Hash of the coinstake that qualified the address, when reported
    #[serde(skip_serializing_if = "Option::is_none")]
    pub coinstake: Option<String>,
}

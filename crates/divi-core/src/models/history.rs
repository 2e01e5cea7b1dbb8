//! Transaction history entries

use serde::Serialize;

/// One transaction touching an address, with the net effect on its balance
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionSummary {
    pub txid: String,
    /// Block height, `None` while the transaction sits in the mempool
    pub height: Option<u64>,
    /// Net amount delta for the address, in satoshis
    pub amount: i64,
    /// Unix timestamp, when the node reports one
    pub timestamp: Option<i64>,
    pub confirmed: bool,
}

impl TransactionSummary {
    pub fn confirmed(txid: impl Into<String>, height: u64, amount: i64, timestamp: Option<i64>) -> Self {
        Self {
            txid: txid.into(),
            height: Some(height),
            amount,
            timestamp,
            confirmed: true,
        }
    }

    pub fn pending(txid: impl Into<String>, amount: i64, timestamp: Option<i64>) -> Self {
        Self {
            txid: txid.into(),
            height: None,
            amount,
            timestamp,
            confirmed: false,
        }
    }
}

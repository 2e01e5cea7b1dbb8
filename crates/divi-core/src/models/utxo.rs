//! Unspent outputs and the balance view derived from them

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{GatewayError, GatewayResult};

/// An unspent transaction output as reported by the node's address index
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Utxo {
    pub txid: String,
    pub output_index: u32,
    /// Amount in satoshis
    pub satoshis: i64,
    /// Confirmation depth. When the node reports only a block height this is
    /// 1 for any mined output and 0 for mempool outputs.
    pub confirmations: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub height: Option<u64>,
    pub address: String,
    /// Output script (hex), used as the address-class tag
    #[serde(skip_serializing_if = "Option::is_none")]
    pub script: Option<String>,
}

/// Wire shape of one `getaddressutxos` entry
#[derive(Deserialize)]
struct NodeUtxo {
    txid: String,
    #[serde(rename = "outputIndex", alias = "vout", alias = "index")]
    output_index: u32,
    #[serde(alias = "amount")]
    satoshis: i64,
    #[serde(default)]
    confirmations: Option<u64>,
    #[serde(default)]
    height: Option<i64>,
    #[serde(default)]
    address: Option<String>,
    #[serde(default)]
    script: Option<String>,
}

impl Utxo {
    /// Parse one node entry. `address` is used when the node omits it.
    pub fn from_node(value: &Value, address: &str) -> GatewayResult<Self> {
        let raw: NodeUtxo = serde_json::from_value(value.clone())
            .map_err(|e| GatewayError::bad_response(format!("Malformed UTXO entry: {}", e)))?;

        let height = raw.height.filter(|h| *h > 0).map(|h| h as u64);
        let confirmations = match (raw.confirmations, height) {
            (Some(c), _) => c,
            (None, Some(_)) => 1,
            (None, None) => 0,
        };

        Ok(Self {
            txid: raw.txid,
            output_index: raw.output_index,
            satoshis: raw.satoshis,
            confirmations,
            height,
            address: raw.address.unwrap_or_else(|| address.to_string()),
            script: raw.script,
        })
    }

    /// Whether this output has been mined
    pub fn is_confirmed(&self) -> bool {
        self.confirmations > 0
    }
}

/// Balance of one address, split by confirmation state.
///
/// Assembled from independently-timed node calls: each amount is accurate
/// as of the page of the listing that produced it, and pages may reflect
/// slightly different chain heights. No reconciliation is attempted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BalanceView {
    pub address: String,
    pub is_vault: bool,
    /// Sum of confirmed outputs, in satoshis
    pub confirmed: i64,
    /// Sum of unconfirmed outputs, in satoshis
    pub unconfirmed: i64,
    pub utxo_count: usize,
}

impl BalanceView {
    /// Zero-valued view for an address with no matching outputs
    pub fn empty(address: impl Into<String>, is_vault: bool) -> Self {
        Self {
            address: address.into(),
            is_vault,
            confirmed: 0,
            unconfirmed: 0,
            utxo_count: 0,
        }
    }

    /// Add one output to the running totals
    pub fn add(&mut self, utxo: &Utxo) {
        if utxo.is_confirmed() {
            self.confirmed += utxo.satoshis;
        } else {
            self.unconfirmed += utxo.satoshis;
        }
        self.utxo_count += 1;
    }
}

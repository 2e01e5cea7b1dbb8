//! AggregationService - composes node calls into single-address views
//!
//! Every method here issues its node calls sequentially and returns a
//! snapshot: fields come from independently-timed calls and may reflect
//! slightly different chain heights. Nothing is cached.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use divi_core::validate;
use divi_core::{
    BalanceView, GatewayError, GatewayResult, LotterySummary, MempoolSummary, NodeRpc, RawMempool,
    TransactionSummary, Utxo,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, instrument};

use crate::reshape;
use crate::vault::{NodeListingClassifier, VaultClassifier};

/// Upper bound on UTXO listing pages fetched for one address
pub const DEFAULT_MAX_PAGES: usize = 1000;

/// One `getaddressdeltas` entry
#[derive(Deserialize)]
struct NodeDelta {
    txid: String,
    satoshis: i64,
    #[serde(default)]
    height: Option<u64>,
    #[serde(default, alias = "time", alias = "blocktime")]
    timestamp: Option<i64>,
}

/// One `getaddressmempool` entry
#[derive(Deserialize)]
struct NodeMempoolDelta {
    txid: String,
    satoshis: i64,
    #[serde(default, alias = "time")]
    timestamp: Option<i64>,
}

fn entries<T: serde::de::DeserializeOwned>(value: Value, method: &str) -> GatewayResult<Vec<T>> {
    serde_json::from_value(value)
        .map_err(|e| GatewayError::bad_response(format!("Malformed {} result: {}", method, e)))
}

/// Derived-resource service over a [`NodeRpc`] connection
#[derive(Clone)]
pub struct AggregationService {
    node: Arc<dyn NodeRpc>,
    classifier: Arc<dyn VaultClassifier>,
    max_pages: usize,
}

impl AggregationService {
    /// Create a service that trusts the node's vault listing parameter
    pub fn new(node: Arc<dyn NodeRpc>) -> Self {
        Self {
            node,
            classifier: Arc::new(NodeListingClassifier),
            max_pages: DEFAULT_MAX_PAGES,
        }
    }

    /// Replace the vault classification rule
    pub fn with_classifier(mut self, classifier: Arc<dyn VaultClassifier>) -> Self {
        self.classifier = classifier;
        self
    }

    /// Bound the number of UTXO listing pages per request
    pub fn with_max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = max_pages.max(1);
        self
    }

    /// The underlying node connection
    pub fn node(&self) -> &Arc<dyn NodeRpc> {
        &self.node
    }

    // =========================================================================
    // UTXOs and balance
    // =========================================================================

    /// Fetch every page of the address's UTXO listing.
    ///
    /// The node answers either with a bare list (complete) or with
    /// `{"utxos": [...], "next": cursor}`; pages are requested until `next`
    /// is absent or null. A listing that does not terminate within the page
    /// bound fails rather than yielding a partial set.
    async fn utxo_entries(&self, address: &str, listing_flag: bool) -> GatewayResult<Vec<Value>> {
        let mut collected = Vec::new();
        let mut cursor: Option<Value> = None;

        for page in 0..self.max_pages {
            let mut selector = json!({ "addresses": [address] });
            if let Some(start) = &cursor {
                selector["start"] = start.clone();
            }

            let result = self
                .node
                .call("getaddressutxos", vec![selector, json!(listing_flag)])
                .await?;

            match result {
                Value::Array(items) => {
                    collected.extend(items);
                    return Ok(collected);
                }
                Value::Object(mut obj) => {
                    match obj.remove("utxos") {
                        Some(Value::Array(items)) => collected.extend(items),
                        _ => {
                            return Err(GatewayError::bad_response(
                                "Paged getaddressutxos result has no utxos list",
                            ))
                        }
                    }
                    match obj.remove("next") {
                        None | Some(Value::Null) => return Ok(collected),
                        Some(next) => {
                            debug!(page = page + 1, "Fetching next UTXO page");
                            cursor = Some(next);
                        }
                    }
                }
                _ => {
                    return Err(GatewayError::bad_response(
                        "getaddressutxos result is neither a list nor a page",
                    ))
                }
            }
        }

        Err(GatewayError::bad_response(format!(
            "UTXO listing for {} did not complete within {} pages",
            address, self.max_pages
        )))
    }

    /// Unspent outputs of `address` in the requested vault class
    #[instrument(skip(self))]
    pub async fn utxos(&self, address: &str, is_vault: bool) -> GatewayResult<Vec<Utxo>> {
        validate::address(address)?;

        let flag = self.classifier.listing_flag(is_vault);
        let mut utxos = Vec::new();
        for entry in self.utxo_entries(address, flag).await? {
            let utxo = Utxo::from_node(&entry, address)?;
            if self.classifier.accepts(&utxo, is_vault) {
                utxos.push(utxo);
            }
        }
        Ok(utxos)
    }

    /// Confirmed and unconfirmed balance of `address`.
    ///
    /// Summed only once the complete listing has been fetched. An address
    /// with no matching outputs yields a zero balance.
    #[instrument(skip(self))]
    pub async fn balance(&self, address: &str, is_vault: bool) -> GatewayResult<BalanceView> {
        let utxos = self.utxos(address, is_vault).await?;

        let mut view = BalanceView::empty(address, is_vault);
        for utxo in &utxos {
            view.add(utxo);
        }
        debug!(
            confirmed = view.confirmed,
            unconfirmed = view.unconfirmed,
            outputs = view.utxo_count,
            "Balance assembled"
        );
        Ok(view)
    }

    // =========================================================================
    // History
    // =========================================================================

    /// Transactions touching `address`: mempool entries first, then
    /// confirmed ones by descending height, each txid exactly once.
    ///
    /// Only the confirmed listing is split by vault class. The node's
    /// mempool index takes no class parameter, so pending entries are the
    /// same for `is_vault` true and false. Deltas carry no script, so the
    /// classifier's output predicate does not apply here.
    #[instrument(skip(self))]
    pub async fn history(&self, address: &str, is_vault: bool) -> GatewayResult<Vec<TransactionSummary>> {
        validate::address(address)?;
        let flag = self.classifier.listing_flag(is_vault);

        let deltas = self
            .node
            .call(
                "getaddressdeltas",
                vec![json!({ "addresses": [address] }), json!(flag)],
            )
            .await?;
        let confirmed = group_confirmed(entries(deltas, "getaddressdeltas")?);

        let mempool = self
            .node
            .call("getaddressmempool", vec![json!({ "addresses": [address] })])
            .await?;
        let pending = group_pending(entries(mempool, "getaddressmempool")?);

        Ok(merge_history(confirmed, pending))
    }

    // =========================================================================
    // Mempool and lottery
    // =========================================================================

    pub async fn mempool_summary(&self) -> GatewayResult<MempoolSummary> {
        let value = self.node.call("getmempoolinfo", vec![]).await?;
        reshape::mempool_summary(&value)
    }

    pub async fn raw_mempool(&self) -> GatewayResult<RawMempool> {
        let value = self.node.call("getrawmempool", vec![]).await?;
        reshape::raw_mempool(&value)
    }

    pub async fn lottery(&self, block_height: Option<u64>) -> GatewayResult<LotterySummary> {
        // Height 0 asks for the current candidates, like no height at all
        let block_height = block_height.filter(|h| *h > 0);
        let params = block_height.map(|h| vec![json!(h)]).unwrap_or_default();
        let value = self.node.call("getlotteryblockwinners", params).await?;
        reshape::lottery_summary(&value, block_height)
    }
}

/// Collapse per-output deltas into one summary per txid
fn group_confirmed(deltas: Vec<NodeDelta>) -> Vec<TransactionSummary> {
    let mut by_txid: HashMap<String, TransactionSummary> = HashMap::new();
    for delta in deltas {
        let entry = by_txid
            .entry(delta.txid.clone())
            .or_insert_with(|| TransactionSummary::confirmed(delta.txid, 0, 0, None));
        entry.amount += delta.satoshis;
        entry.height = entry.height.max(delta.height);
        entry.timestamp = entry.timestamp.or(delta.timestamp);
    }
    by_txid.into_values().collect()
}

fn group_pending(deltas: Vec<NodeMempoolDelta>) -> Vec<TransactionSummary> {
    let mut by_txid: HashMap<String, TransactionSummary> = HashMap::new();
    for delta in deltas {
        let entry = by_txid
            .entry(delta.txid.clone())
            .or_insert_with(|| TransactionSummary::pending(delta.txid, 0, None));
        entry.amount += delta.satoshis;
        entry.timestamp = entry.timestamp.max(delta.timestamp);
    }
    by_txid.into_values().collect()
}

/// Merge confirmed and mempool summaries into one ordered history.
///
/// Mempool entries come first (newest first), then confirmed entries by
/// descending height; txid breaks ties. A txid present in both lists keeps
/// only its confirmed record. Duplicate txids within either list collapse
/// to their first occurrence after ordering.
pub fn merge_history(
    mut confirmed: Vec<TransactionSummary>,
    mut pending: Vec<TransactionSummary>,
) -> Vec<TransactionSummary> {
    confirmed.sort_by(|a, b| b.height.cmp(&a.height).then_with(|| a.txid.cmp(&b.txid)));
    pending.sort_by(|a, b| {
        b.timestamp
            .cmp(&a.timestamp)
            .then_with(|| a.txid.cmp(&b.txid))
    });

    let confirmed_ids: HashSet<String> = confirmed.iter().map(|t| t.txid.clone()).collect();
    let mut seen: HashSet<String> = HashSet::new();

    let pending = pending
        .into_iter()
        .filter(|t| !confirmed_ids.contains(&t.txid) && seen.insert(t.txid.clone()));
    let mut merged: Vec<TransactionSummary> = pending.collect();

    merged.extend(
        confirmed
            .into_iter()
            .filter(|t| seen.insert(t.txid.clone())),
    );
    merged
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;

    use async_trait::async_trait;
    use parking_lot::Mutex;
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::vault::ScriptTagClassifier;

    const ADDR: &str = "DQkwDpRYUyNNnoLbtG7uSNMpG8gYvmQuVD";

    /// Scripted node: answers each method from a queue, recording calls
    #[derive(Default)]
    struct ScriptedNode {
        replies: Mutex<HashMap<String, VecDeque<GatewayResult<Value>>>>,
        calls: Mutex<Vec<(String, Vec<Value>)>>,
    }

    impl ScriptedNode {
        fn reply(self, method: &str, result: GatewayResult<Value>) -> Self {
            self.replies
                .lock()
                .entry(method.to_string())
                .or_default()
                .push_back(result);
            self
        }

        fn calls(&self) -> Vec<(String, Vec<Value>)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl NodeRpc for ScriptedNode {
        async fn call(&self, method: &str, params: Vec<Value>) -> GatewayResult<Value> {
            self.calls.lock().push((method.to_string(), params));
            self.replies
                .lock()
                .get_mut(method)
                .and_then(|q| q.pop_front())
                .unwrap_or_else(|| Err(GatewayError::unreachable("no scripted reply")))
        }
    }

    fn service(node: ScriptedNode) -> (Arc<ScriptedNode>, AggregationService) {
        let node = Arc::new(node);
        let svc = AggregationService::new(node.clone());
        (node, svc)
    }

    fn utxo_json(txid: &str, satoshis: i64, height: i64) -> Value {
        json!({"address": ADDR, "txid": txid, "outputIndex": 0, "satoshis": satoshis, "height": height, "script": "76a914"})
    }

    // =========================================================================
    // Balance
    // =========================================================================

    #[tokio::test]
    async fn test_balance_sums_confirmed_and_unconfirmed() {
        let node = ScriptedNode::default().reply(
            "getaddressutxos",
            Ok(json!([
                utxo_json("a", 100, 10),
                utxo_json("b", 250, 11),
                utxo_json("c", 40, 0),
            ])),
        );
        let (node, svc) = service(node);

        let view = svc.balance(ADDR, false).await.unwrap();
        assert_eq!(view.confirmed, 350);
        assert_eq!(view.unconfirmed, 40);
        assert_eq!(view.utxo_count, 3);
        assert!(!view.is_vault);

        let calls = node.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].1, vec![json!({"addresses": [ADDR]}), json!(false)]);
    }

    #[tokio::test]
    async fn test_balance_of_empty_address_is_zero() {
        let node = ScriptedNode::default().reply("getaddressutxos", Ok(json!([])));
        let (_, svc) = service(node);

        let view = svc.balance(ADDR, true).await.unwrap();
        assert_eq!(view, BalanceView::empty(ADDR, true));
    }

    #[tokio::test]
    async fn test_balance_follows_pagination_to_completion() {
        let node = ScriptedNode::default()
            .reply(
                "getaddressutxos",
                Ok(json!({"utxos": [utxo_json("a", 5, 1)], "next": 1})),
            )
            .reply(
                "getaddressutxos",
                Ok(json!({"utxos": [utxo_json("b", 7, 2)], "next": 2})),
            )
            .reply(
                "getaddressutxos",
                Ok(json!({"utxos": [utxo_json("c", 11, 3)], "next": null})),
            );
        let (node, svc) = service(node);

        let view = svc.balance(ADDR, false).await.unwrap();
        assert_eq!(view.confirmed, 23);

        let calls = node.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].1[0].get("start").is_none());
        assert_eq!(calls[1].1[0]["start"], json!(1));
        assert_eq!(calls[2].1[0]["start"], json!(2));
    }

    #[tokio::test]
    async fn test_failed_page_never_yields_partial_balance() {
        let node = ScriptedNode::default()
            .reply(
                "getaddressutxos",
                Ok(json!({"utxos": [utxo_json("a", 5, 1)], "next": 1})),
            )
            .reply("getaddressutxos", Err(GatewayError::Timeout));
        let (_, svc) = service(node);

        assert!(matches!(svc.balance(ADDR, false).await, Err(GatewayError::Timeout)));
    }

    #[tokio::test]
    async fn test_unterminated_pagination_is_error() {
        let mut node = ScriptedNode::default();
        for i in 0..3 {
            node = node.reply(
                "getaddressutxos",
                Ok(json!({"utxos": [utxo_json("a", 1, 1)], "next": i + 1})),
            );
        }
        let (_, svc) = service(node);
        let svc = svc.with_max_pages(3);

        let err = svc.balance(ADDR, false).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }

    #[tokio::test]
    async fn test_invalid_address_makes_no_node_call() {
        let (node, svc) = service(ScriptedNode::default());

        let err = svc.balance("not-an-address!", false).await.unwrap_err();
        assert!(matches!(err, GatewayError::Validation(_)));
        assert!(node.calls().is_empty());
    }

    #[tokio::test]
    async fn test_classifier_filters_outputs() {
        let node = ScriptedNode::default().reply(
            "getaddressutxos",
            Ok(json!([
                {"txid": "v", "outputIndex": 0, "satoshis": 1000, "height": 5, "script": "b9aa"},
                {"txid": "p", "outputIndex": 1, "satoshis": 1, "height": 5, "script": "76a914"},
            ])),
        );
        let (_, svc) = service(node);
        let svc = svc.with_classifier(Arc::new(ScriptTagClassifier::new("b9").unwrap()));

        let view = svc.balance(ADDR, true).await.unwrap();
        assert_eq!(view.confirmed, 1000);
        assert_eq!(view.utxo_count, 1);
    }

    // =========================================================================
    // History
    // =========================================================================

    #[tokio::test]
    async fn test_history_orders_mempool_first_and_dedups() {
        let node = ScriptedNode::default()
            .reply(
                "getaddressdeltas",
                Ok(json!([
                    {"txid": "t1", "satoshis": 500, "height": 100, "index": 0},
                    {"txid": "t2", "satoshis": -200, "height": 120, "index": 0},
                    {"txid": "t2", "satoshis": 50, "height": 120, "index": 1},
                    {"txid": "t3", "satoshis": 10, "height": 130, "index": 0},
                ])),
            )
            .reply(
                "getaddressmempool",
                Ok(json!([
                    {"txid": "m1", "satoshis": 70, "timestamp": 1700000000},
                    {"txid": "t3", "satoshis": 10, "timestamp": 1700000001},
                ])),
            );
        let (_, svc) = service(node);

        let history = svc.history(ADDR, false).await.unwrap();
        let ids: Vec<&str> = history.iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["m1", "t3", "t2", "t1"]);

        assert!(!history[0].confirmed);
        assert_eq!(history[0].height, None);
        assert!(history[1].confirmed);
        assert_eq!(history[1].height, Some(130));
        assert_eq!(history[2].amount, -150);
    }

    #[tokio::test]
    async fn test_history_vault_flag_only_reaches_deltas() {
        let node = ScriptedNode::default()
            .reply("getaddressdeltas", Ok(json!([])))
            .reply("getaddressmempool", Ok(json!([])));
        let (node, svc) = service(node);

        assert!(svc.history(ADDR, true).await.unwrap().is_empty());
        let calls = node.calls();
        assert_eq!(calls[0].1, vec![json!({"addresses": [ADDR]}), json!(true)]);
        assert_eq!(calls[1].0, "getaddressmempool");
        assert_eq!(calls[1].1, vec![json!({"addresses": [ADDR]})]);
    }

    #[tokio::test]
    async fn test_history_malformed_deltas_is_transport_error() {
        let node = ScriptedNode::default().reply("getaddressdeltas", Ok(json!({"oops": 1})));
        let (_, svc) = service(node);

        let err = svc.history(ADDR, false).await.unwrap_err();
        assert!(matches!(err, GatewayError::Transport { .. }));
    }

    #[test]
    fn test_merge_is_idempotent_and_duplicate_free() {
        let confirmed = vec![
            TransactionSummary::confirmed("a", 10, 1, None),
            TransactionSummary::confirmed("b", 12, 2, None),
            TransactionSummary::confirmed("b", 12, 2, None),
        ];
        let pending = vec![
            TransactionSummary::pending("b", 2, Some(5)),
            TransactionSummary::pending("c", 3, Some(6)),
        ];

        let merged = merge_history(confirmed, pending);
        let ids: Vec<&str> = merged.iter().map(|t| t.txid.as_str()).collect();
        assert_eq!(ids, vec!["c", "b", "a"]);
        assert!(merged.iter().find(|t| t.txid == "b").unwrap().confirmed);

        let (again_confirmed, again_pending): (Vec<_>, Vec<_>) =
            merged.iter().cloned().partition(|t| t.confirmed);
        assert_eq!(merge_history(again_confirmed, again_pending), merged);
    }

    // =========================================================================
    // Mempool and lottery
    // =========================================================================

    #[tokio::test]
    async fn test_lottery_passes_height() {
        let node = ScriptedNode::default().reply(
            "getlotteryblockwinners",
            Ok(json!({"Lottery Winners": [{"Address": "DWin", "Rank": 1}]})),
        );
        let (node, svc) = service(node);

        let summary = svc.lottery(Some(900)).await.unwrap();
        assert_eq!(summary.block_height, Some(900));
        assert_eq!(node.calls()[0].1, vec![json!(900)]);
    }

    #[tokio::test]
    async fn test_lottery_height_zero_means_current() {
        let node = ScriptedNode::default()
            .reply("getlotteryblockwinners", Ok(json!(["DWin"])));
        let (node, svc) = service(node);

        let summary = svc.lottery(Some(0)).await.unwrap();
        assert_eq!(summary.block_height, None);
        assert!(node.calls()[0].1.is_empty());
    }

    #[tokio::test]
    async fn test_mempool_summary_propagates_node_error() {
        let node = ScriptedNode::default().reply(
            "getmempoolinfo",
            Err(GatewayError::NodeRpc {
                code: -32601,
                message: "Method not found".into(),
            }),
        );
        let (_, svc) = service(node);

        assert!(matches!(
            svc.mempool_summary().await,
            Err(GatewayError::NodeRpc { code: -32601, .. })
        ));
    }
}

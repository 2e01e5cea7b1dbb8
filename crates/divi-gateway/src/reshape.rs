//! Reshaping of node results into version-stable shapes
//!
//! Field names are matched after normalization (lowercase, spaces and
//! underscores removed) so that `"Lottery Winners"`, `lottery_winners` and
//! `lotterywinners` all resolve to the same field.

use divi_core::{GatewayError, GatewayResult, LotterySummary, LotteryWinner, MempoolSummary, RawMempool};
use serde_json::{Map, Value};

fn normalize(key: &str) -> String {
    key.chars()
        .filter(|c| *c != ' ' && *c != '_')
        .flat_map(char::to_lowercase)
        .collect()
}

/// First field of `obj` whose normalized key is one of `names`
fn field<'a>(obj: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    obj.iter()
        .find(|(k, _)| names.contains(&normalize(k).as_str()))
        .map(|(_, v)| v)
}

fn as_u64(value: &Value) -> Option<u64> {
    value
        .as_u64()
        .or_else(|| value.as_str().and_then(|s| s.parse().ok()))
}

/// `getmempoolinfo` → [`MempoolSummary`]
pub fn mempool_summary(value: &Value) -> GatewayResult<MempoolSummary> {
    let obj = value
        .as_object()
        .ok_or_else(|| GatewayError::bad_response("getmempoolinfo result is not an object"))?;

    let size = field(obj, &["size", "txcount", "count"])
        .and_then(as_u64)
        .ok_or_else(|| GatewayError::bad_response("getmempoolinfo result has no size"))?;

    Ok(MempoolSummary {
        size,
        bytes: field(obj, &["bytes", "totalbytes"]).and_then(as_u64).unwrap_or(0),
        usage: field(obj, &["usage", "memoryusage"]).and_then(as_u64),
    })
}

/// `getrawmempool` (plain or verbose) → [`RawMempool`]
pub fn raw_mempool(value: &Value) -> GatewayResult<RawMempool> {
    let txids: Vec<String> = match value {
        Value::Array(items) => items
            .iter()
            .map(|v| {
                v.as_str()
                    .map(str::to_string)
                    .ok_or_else(|| GatewayError::bad_response("getrawmempool entry is not a txid"))
            })
            .collect::<GatewayResult<_>>()?,
        Value::Object(obj) => obj.keys().cloned().collect(),
        _ => {
            return Err(GatewayError::bad_response(
                "getrawmempool result is neither a list nor an object",
            ))
        }
    };

    Ok(RawMempool {
        count: txids.len(),
        txids,
    })
}

fn lottery_entries(value: &Value) -> Option<&Vec<Value>> {
    match value {
        Value::Array(items) => Some(items),
        Value::Object(obj) => field(
            obj,
            &["lotterywinners", "winners", "lotterycandidates", "candidates"],
        )
        .and_then(Value::as_array),
        _ => None,
    }
}

fn lottery_winner(entry: &Value) -> Option<LotteryWinner> {
    match entry {
        Value::String(address) => Some(LotteryWinner {
            address: address.clone(),
            rank: None,
            amount: None,
            coinstake: None,
        }),
        Value::Object(obj) => {
            let address = field(obj, &["address", "winner"])?.as_str()?.to_string();
            Some(LotteryWinner {
                address,
                rank: field(obj, &["rank", "position"])
                    .and_then(as_u64)
                    .and_then(|r| u32::try_from(r).ok()),
                amount: field(obj, &["amount", "reward", "payout"]).and_then(Value::as_f64),
                coinstake: field(obj, &["coinstake", "coinstakehash", "hash"])
                    .and_then(Value::as_str)
                    .map(str::to_string),
            })
        }
        _ => None,
    }
}

/// `getlotteryblockwinners` → [`LotterySummary`]
///
/// `requested_height` is used when the node does not echo the height.
pub fn lottery_summary(value: &Value, requested_height: Option<u64>) -> GatewayResult<LotterySummary> {
    let entries = lottery_entries(value).ok_or_else(|| {
        GatewayError::bad_response("getlotteryblockwinners result has no winner list")
    })?;

    let winners = entries
        .iter()
        .map(|entry| {
            lottery_winner(entry)
                .ok_or_else(|| GatewayError::bad_response("Lottery entry has no address"))
        })
        .collect::<GatewayResult<Vec<_>>>()?;

    let echoed_height = value
        .as_object()
        .and_then(|obj| field(obj, &["height", "blockheight"]))
        .and_then(as_u64);

    Ok(LotterySummary {
        block_height: echoed_height.or(requested_height),
        winners,
    })
}

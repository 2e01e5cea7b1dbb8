//! Derived resource models
//!
//! Every model here is assembled per request from one or more node calls
//! and discarded once the response is serialized.

mod history;
mod summary;
mod utxo;

pub use history::TransactionSummary;
pub use summary::{LotterySummary, LotteryWinner, MempoolSummary, RawMempool};
pub use utxo::{BalanceView, Utxo};

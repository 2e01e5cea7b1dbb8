//! divi-gateway - Aggregation of node calls into derived resources
//!
//! The node exposes balances and history only as raw index listings.
//! [`AggregationService`] composes those listings into single-address
//! views, and reshapes mempool and lottery results into shapes that do not
//! change between node releases.

mod aggregate;
pub mod reshape;
pub mod vault;

pub use aggregate::{merge_history, AggregationService, DEFAULT_MAX_PAGES};
pub use vault::{NodeListingClassifier, ScriptTagClassifier, VaultClassifier};

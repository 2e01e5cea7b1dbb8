//! divi-core - Core traits and types for the Divi RPC gateway
//!
//! This crate provides the abstractions shared by the RPC transport, the
//! aggregation layer and the HTTP API: the gateway error taxonomy, the
//! derived resource models, and the [`NodeRpc`] seam that everything
//! above the transport talks to.

pub mod error;
pub mod models;
pub mod node;
pub mod validate;

pub use error::{GatewayError, GatewayResult};
pub use models::*;
pub use node::{is_idempotent, MethodKind, NodeRpc};

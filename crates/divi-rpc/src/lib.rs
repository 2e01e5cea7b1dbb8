//! Divi RPC client library
//!
//! Resolves node credentials and executes JSON-RPC calls against a Divi
//! node, classifying every failure into a [`GatewayError`] kind.
//!
//! # Example
//!
//! ```rust,ignore
//! use divi_rpc::{CredentialResolver, RpcClient};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let credentials = CredentialResolver::new().resolve()?;
//!     let client = RpcClient::new(credentials)?;
//!
//!     let height = client.get_block_count().await?;
//!     println!("chain height: {}", height);
//!     Ok(())
//! }
//! ```
//!
//! # Testing
//!
//! The `testing` module provides a scripted mock node:
//!
//! ```rust,ignore
//! use divi_rpc::testing::{MockNode, MockReply};
//!
//! let node = MockNode::start().await?;
//! node.respond("getblockcount", MockReply::Result(json!(12345)));
//! let client = RpcClient::new(node.credentials())?;
//! ```

mod client;
pub mod credentials;
pub mod testing;
mod types;

pub use client::{RpcClient, RpcConfig};
pub use credentials::{CredentialResolver, Credentials};
pub use divi_core::{GatewayError, GatewayResult};
pub use types::{RpcErrorObject, RpcRequest, RpcResponse};

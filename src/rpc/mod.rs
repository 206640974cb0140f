//! Abstract RPC surface of the wallet daemon
//!
//! The daemon exposes one administrative ("master") endpoint and one endpoint
//! per asset; both speak the same JSON-RPC dialect and are consumed through
//! the same client.

pub mod client;
pub mod types;

pub use client::{RpcClient, RpcEndpoint};
pub use types::{SignedTransaction, TxInputRef, UnspentOutput};

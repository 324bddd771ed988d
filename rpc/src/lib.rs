//! Client side of the ledger node's JSON RPC.
//!
//! [`LedgerRpc`] is the narrow contract the block tooling depends on:
//! account lookups, block construction, block submission, difficulty queries
//! and node wallet management. [`NodeRpc`] implements it over HTTP.

pub mod client;
pub mod contract;
pub mod error;

pub use client::NodeRpc;
pub use contract::{
    AccountBalance, AccountInfo, ActiveDifficulty, BlockCreateRequest, CreatedBlock, LedgerRpc,
};
pub use error::RpcError;

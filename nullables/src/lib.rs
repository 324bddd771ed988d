//! Nullable infrastructure for deterministic testing.
//!
//! [`NullLedgerRpc`] stands in for a ledger node behind the [`LedgerRpc`]
//! contract. It:
//! - Keeps account chains in memory and applies published blocks
//! - Signs `block_create` requests locally, the way a node would
//! - Records every call for assertions
//! - Can be told to fail specific calls
//!
//! [`LedgerRpc`]: nanomock_rpc::LedgerRpc

pub mod ledger;

pub use ledger::{NullLedgerRpc, RpcCall};

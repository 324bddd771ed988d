//! Fundamental types for the nanomock block tooling.
//!
//! This crate defines the types shared across every other crate in the workspace:
//! account addresses, keys, block hashes and links, raw amounts, and the JSON
//! shape of a state block as exchanged with a ledger node.

pub mod account;
pub mod amount;
pub mod block;
pub mod error;
pub mod keys;

pub use account::Account;
pub use amount::Amount;
pub use block::{epoch_link, BlockHash, BlockSubtype, JsonBlock, Link, WorkNonce};
pub use error::TypesError;
pub use keys::{PrivateKey, PublicKey, Seed, Signature};

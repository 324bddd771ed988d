//! Cryptographic primitives for ledger blocks.
//!
//! - **Ed25519 with Blake2b-512** for key derivation and block signatures
//! - **Blake2b-256** for block hashes and deterministic key derivation
//! - `AccountKey`: the bundle of private key, public key and account address
//!   derived from either a raw private key or a `(seed, index)` pair

pub mod hash;
pub mod keys;
pub mod sign;
pub mod state_block;

pub use hash::{blake2b_256, blake2b_256_multi};
pub use keys::{deterministic_private_key, public_from_private, AccountKey, KeyError, KeySpec};
pub use sign::{sign_message, verify_signature};
pub use state_block::{hash_state_block, sign_state_block, StateBlockFields};

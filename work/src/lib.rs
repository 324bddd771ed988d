//! Proof-of-work for ledger blocks.
//!
//! A nonce is valid for a block when `Blake2b-64(nonce_le || root)`, read as a
//! little-endian `u64`, is at least the difficulty threshold. The root is the
//! block's `previous` hash, or the account public key for an open block.

pub mod difficulty;
pub mod error;
pub mod generator;
pub mod validator;

pub use difficulty::{format_difficulty, parse_difficulty, Difficulty};
pub use error::WorkError;
pub use generator::WorkGenerator;
pub use validator::{block_root, validate_block_work, validate_work, work_value};

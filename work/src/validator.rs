//! PoW validation.

use blake2::digest::consts::U8;
use blake2::{Blake2b, Digest};
use nanomock_types::JsonBlock;

use crate::WorkError;

type Blake2b64 = Blake2b<U8>;

/// Compute the work value of `nonce` against `root`.
pub fn work_value(root: &[u8; 32], nonce: u64) -> u64 {
    let mut hasher = Blake2b64::new();
    hasher.update(nonce.to_le_bytes());
    hasher.update(root);
    let digest = hasher.finalize();
    let mut bytes = [0u8; 8];
    bytes.copy_from_slice(&digest);
    u64::from_le_bytes(bytes)
}

/// Validate that a work nonce meets the minimum difficulty for a given root.
pub fn validate_work(root: &[u8; 32], nonce: u64, min_difficulty: u64) -> bool {
    work_value(root, nonce) >= min_difficulty
}

/// The root a block's work is computed against.
pub fn block_root(block: &JsonBlock) -> [u8; 32] {
    if block.previous.is_zero() {
        *block.account.public_key().as_bytes()
    } else {
        *block.previous.as_bytes()
    }
}

/// Check the `work` field of a JSON block.
pub fn validate_block_work(block: &JsonBlock, min_difficulty: u64) -> Result<(), WorkError> {
    let actual = work_value(&block_root(block), block.work.0);
    if actual >= min_difficulty {
        Ok(())
    } else {
        Err(WorkError::InsufficientDifficulty {
            actual,
            minimum: min_difficulty,
        })
    }
}

//! State-block hashing and signing.
//!
//! Hash layout: `Blake2b-256(preamble || account || previous || representative || balance_be128 || link)`
//! where the preamble is 32 bytes with the last byte set to the state block type (6).

use nanomock_types::{Account, Amount, BlockHash, BlockSubtype, JsonBlock, Link, WorkNonce};

use crate::hash::blake2b_256_multi;
use crate::keys::AccountKey;
use crate::sign::sign_message;

const STATE_BLOCK_PREAMBLE: [u8; 32] = {
    let mut preamble = [0u8; 32];
    preamble[31] = 6;
    preamble
};

/// The hashed content of a state block.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StateBlockFields {
    pub account: Account,
    pub previous: BlockHash,
    pub representative: Account,
    pub balance: Amount,
    pub link: Link,
}

impl StateBlockFields {
    /// The value proof-of-work is computed against: `previous`, or the account key for an open.
    pub fn work_root(&self) -> [u8; 32] {
        if self.previous.is_zero() {
            *self.account.public_key().as_bytes()
        } else {
            *self.previous.as_bytes()
        }
    }
}

pub fn hash_state_block(fields: &StateBlockFields) -> BlockHash {
    BlockHash::new(blake2b_256_multi(&[
        &STATE_BLOCK_PREAMBLE,
        fields.account.public_key().as_bytes(),
        fields.previous.as_bytes(),
        fields.representative.public_key().as_bytes(),
        &fields.balance.to_be_bytes(),
        fields.link.as_bytes(),
    ]))
}

/// Hash and sign a state block, producing the JSON form a node accepts in `process`.
pub fn sign_state_block(
    fields: &StateBlockFields,
    key: &AccountKey,
    work: WorkNonce,
    subtype: Option<BlockSubtype>,
) -> (BlockHash, JsonBlock) {
    let hash = hash_state_block(fields);
    let signature = sign_message(hash.as_bytes(), &key.private);
    let block = JsonBlock {
        block_type: JsonBlock::STATE.to_string(),
        account: fields.account,
        previous: fields.previous,
        representative: fields.representative,
        balance: fields.balance,
        link: fields.link,
        link_as_account: Some(fields.link.as_account()),
        signature,
        work,
        subtype,
    };
    (hash, block)
}

use proptest::prelude::*;

use nanomock_types::{Account, Amount, BlockHash, JsonBlock, Link, PublicKey, Signature};
use nanomock_work::{block_root, validate_block_work, validate_work, WorkGenerator};

fn block(account: [u8; 32], previous: [u8; 32], work: u64) -> JsonBlock {
    JsonBlock {
        block_type: JsonBlock::STATE.to_string(),
        account: Account::from(PublicKey(account)),
        previous: BlockHash::new(previous),
        representative: Account::BURN,
        balance: Amount::ZERO,
        link: Link::ZERO,
        link_as_account: None,
        signature: Signature::ZERO,
        work: nanomock_types::WorkNonce(work),
        subtype: None,
    }
}

proptest! {
    /// Generated PoW always passes its own validation.
    #[test]
    fn generated_pow_always_valid(
        root in prop::array::uniform32(0u8..),
        difficulty in 0u64..50_000,
    ) {
        let nonce = WorkGenerator::new().generate(&root, difficulty).unwrap();
        prop_assert!(validate_work(&root, nonce.0, difficulty));
    }

    /// Zero difficulty always passes regardless of nonce.
    #[test]
    fn zero_difficulty_always_passes(
        root in prop::array::uniform32(0u8..),
        nonce in any::<u64>(),
    ) {
        prop_assert!(validate_work(&root, nonce, 0));
    }

    /// If valid at difficulty D, then valid at D-1.
    #[test]
    fn lower_difficulty_is_easier(
        root in prop::array::uniform32(0u8..),
        nonce in any::<u64>(),
        difficulty in 1u64..u64::MAX,
    ) {
        if validate_work(&root, nonce, difficulty) {
            prop_assert!(validate_work(&root, nonce, difficulty - 1));
        }
    }

    /// Open blocks are rooted at the account, others at `previous`.
    #[test]
    fn block_root_follows_previous(
        account in prop::array::uniform32(0u8..),
        previous in prop::array::uniform32(1u8..),
    ) {
        prop_assert_eq!(block_root(&block(account, [0; 32], 0)), account);
        prop_assert_eq!(block_root(&block(account, previous, 0)), previous);
    }

    /// Work solved for a block's root validates on the block.
    #[test]
    fn solved_block_work_validates(
        account in prop::array::uniform32(0u8..),
        previous in prop::array::uniform32(0u8..),
    ) {
        let unsolved = block(account, previous, 0);
        let nonce = WorkGenerator::new().generate(&block_root(&unsolved), 10_000).unwrap();
        prop_assert!(validate_block_work(&block(account, previous, nonce.0), 10_000).is_ok());
    }
}

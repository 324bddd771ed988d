use proptest::prelude::*;

use nanomock_types::{Account, Amount, BlockHash, PublicKey};

proptest! {
    /// Every public key maps to a 65-character address that decodes back to it.
    #[test]
    fn account_address_decodes_to_same_key(bytes in prop::array::uniform32(0u8..)) {
        let account = Account::from(PublicKey(bytes));
        let encoded = account.encode();
        prop_assert_eq!(encoded.len(), 65);
        prop_assert!(encoded.starts_with("nano_"));
        prop_assert_eq!(Account::decode(&encoded).unwrap(), account);
    }

    /// Flipping any single character of an address is always detected.
    #[test]
    fn corrupted_address_rejected(bytes in prop::array::uniform32(0u8..), pos in 5usize..65) {
        let encoded = Account::from(PublicKey(bytes)).encode();
        let original = encoded.as_bytes()[pos];
        let replacement = if original == b'1' { b'3' } else { b'1' };
        let mut corrupted = encoded.into_bytes();
        corrupted[pos] = replacement;
        let corrupted = String::from_utf8(corrupted).unwrap();
        prop_assert!(Account::decode(&corrupted).is_err());
    }

    /// Amounts survive the decimal-string wire encoding for the full u128 range.
    #[test]
    fn amount_display_parses_back(raw in any::<u128>()) {
        let amount = Amount::raw(raw);
        prop_assert_eq!(amount.to_string().parse::<Amount>().unwrap(), amount);
    }

    /// BlockHash::is_zero is true only for all-zero bytes.
    #[test]
    fn block_hash_is_zero_correct(bytes in prop::array::uniform32(0u8..)) {
        let hash = BlockHash::new(bytes);
        prop_assert_eq!(hash.is_zero(), bytes == [0u8; 32]);
    }
}

use proptest::prelude::*;

use nanomock_blockgen::{multiply, percent, splitting_depth, accounts_for_depth, DecimalFactor};
use nanomock_types::Amount;

proptest! {
    /// 100 percent of any amount is the amount itself.
    #[test]
    fn full_percentage_is_identity(raw in any::<u128>()) {
        let hundred: DecimalFactor = "100".parse().unwrap();
        prop_assert_eq!(percent(Amount::raw(raw), &hundred).unwrap(), Amount::raw(raw));
    }

    /// A percentage up to 100 never exceeds the amount, for the full u128 range.
    #[test]
    fn percentage_never_exceeds_amount(raw in any::<u128>(), whole in 0u32..100, frac in 0u32..10_000) {
        let factor: DecimalFactor = format!("{whole}.{frac:04}").parse().unwrap();
        prop_assert!(percent(Amount::raw(raw), &factor).unwrap() <= Amount::raw(raw));
    }

    /// Integer factors written with a fractional zero part multiply exactly.
    #[test]
    fn integer_factor_multiplies_exactly(raw in 0u128..(1u128 << 100), k in 0u32..1000) {
        let factor: DecimalFactor = format!("{k}.000").parse().unwrap();
        prop_assert_eq!(multiply(Amount::raw(raw), &factor).unwrap(), Amount::raw(raw * k as u128));
    }

    /// The splitting depth is the smallest depth whose tree holds the requested accounts.
    #[test]
    fn splitting_depth_is_minimal(accounts in 1u128..1_000_000, split in 2u32..10) {
        let depth = splitting_depth(accounts, split);
        prop_assert!(accounts_for_depth(split, depth) >= accounts);
        if depth > 1 {
            prop_assert!(accounts_for_depth(split, depth - 1) < accounts);
        }
    }
}

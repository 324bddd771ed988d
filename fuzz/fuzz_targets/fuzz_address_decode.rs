#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(text) = std::str::from_utf8(data) {
        if let Ok(account) = text.parse::<nanomock_types::Account>() {
            // A decoded address re-encodes to one that decodes to the same key.
            let encoded = account.to_string();
            let back: nanomock_types::Account = encoded.parse().expect("re-encoded address must decode");
            assert_eq!(back, account);
        }
        let _ = text.parse::<nanomock_types::BlockHash>();
        let _ = text.parse::<nanomock_types::Amount>();
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use nanomock_blockgen::{multiply, percent, DecimalFactor};
use nanomock_types::Amount;

fuzz_target!(|data: &[u8]| {
    if data.len() < 16 {
        return;
    }
    let mut raw = [0u8; 16];
    raw.copy_from_slice(&data[..16]);
    let amount = Amount::raw(u128::from_le_bytes(raw));

    if let Ok(text) = std::str::from_utf8(&data[16..]) {
        if let Ok(factor) = text.parse::<DecimalFactor>() {
            // Overflow is reported, never a panic.
            let _ = multiply(amount, &factor);
            let _ = percent(amount, &factor);
        }
    }
});

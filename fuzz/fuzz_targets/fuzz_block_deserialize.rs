#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Node responses and block files carry state blocks as JSON.
    // Parsing and checking work must never panic on malformed input.
    if let Ok(block) = serde_json::from_slice::<nanomock_types::JsonBlock>(data) {
        let _ = nanomock_work::validate_block_work(&block, 0xffff_ffc0_0000_0000);
        let _ = serde_json::to_vec(&block);
    }

    let _ = serde_json::from_slice::<nanomock_blockgen::BlockFile>(data);
});

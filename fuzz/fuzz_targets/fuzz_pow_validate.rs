#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // 32 bytes of root, 8 of nonce, then an optional 8-byte threshold.
    if data.len() >= 40 {
        let mut root = [0u8; 32];
        root.copy_from_slice(&data[..32]);
        let mut nonce = [0u8; 8];
        nonce.copy_from_slice(&data[32..40]);
        let nonce = u64::from_le_bytes(nonce);

        let difficulty = match data.get(40..48) {
            Some(bytes) => {
                let mut threshold = [0u8; 8];
                threshold.copy_from_slice(bytes);
                u64::from_le_bytes(threshold)
            }
            None => 0xffff_ffc0_0000_0000,
        };

        let value = nanomock_work::work_value(&root, nonce);
        assert_eq!(nanomock_work::validate_work(&root, nonce, difficulty), value >= difficulty);
    }
});

#![no_main]
use libfuzzer_sys::fuzz_target;
use ton_types::boc::{Boc, BocFlags};

fuzz_target!(|data: &[u8]| {
    if let Ok(cells) = Boc::decode_multi(data) {
        let encoded = Boc::encode_multi(&cells, BocFlags::HAS_CRC);
        let decoded = Boc::decode_multi(encoded).unwrap();
        assert_eq!(cells, decoded);
    }
});

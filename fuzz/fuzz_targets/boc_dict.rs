#![no_main]
use libfuzzer_sys::{fuzz_target, Corpus};

use ton_types::cell::BitString;
use ton_types::dict::{HashMap, NaturalKey, RawValue};
use ton_types::prelude::Boc;

fuzz_target!(|data: &[u8]| -> Corpus {
    if let Ok(cell) = Boc::decode(data) {
        if let Ok(map) = HashMap::<BitString, _, _, _>::parse_with(&cell, 32, NaturalKey, RawValue) {
            _ = map.iter().count();
            _ = map.serialize();
            return Corpus::Keep;
        }
    }
    Corpus::Reject
});

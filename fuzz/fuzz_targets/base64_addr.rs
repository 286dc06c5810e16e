#![no_main]
use libfuzzer_sys::{fuzz_target, Corpus};

use ton_types::address::{StdAddr, StdAddrFormat};

fuzz_target!(|data: &[u8]| -> Corpus {
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok((addr, flags)) = StdAddr::from_str_ext(s, StdAddrFormat::any()) {
            if s.len() == 48 {
                assert_eq!(addr.display_base64(flags).to_string(), s);
            }
            return Corpus::Keep;
        }
    }
    Corpus::Reject
});

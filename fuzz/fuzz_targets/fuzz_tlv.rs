#![no_main]

use libfuzzer_sys::fuzz_target;
use oscar_protocol::core::tlv;

fuzz_target!(|data: &[u8]| {
    if let Ok(tlvs) = tlv::decode_all(data) {
        assert_eq!(tlv::encode_all(&tlvs).ok().as_deref(), Some(data));
    }
});

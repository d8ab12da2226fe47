#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use oscar_protocol::core::codec::FlapCodec;
use oscar_protocol::core::flap;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Whole-buffer scan and the streaming codec must agree on well-formed input
    let scanned = flap::decode_all(data);

    let mut codec = FlapCodec;
    let mut buf = BytesMut::from(data);
    let mut streamed = Vec::new();
    while let Ok(Some(packet)) = codec.decode(&mut buf) {
        streamed.push(packet);
    }

    if let Ok(packets) = scanned {
        assert_eq!(packets, streamed);
        for packet in &packets {
            let _ = packet.snac().and_then(|msg| msg.tlvs());
            let _ = packet.sign_on_tlvs();
        }
    }
});

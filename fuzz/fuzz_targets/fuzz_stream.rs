#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;
use wire_protocol::FrameCodec;

fuzz_target!(|data: &[u8]| {
    // Feed arbitrary bytes through the resyncing codec in small reads
    let mut codec = FrameCodec::new();
    let mut buf = BytesMut::new();
    for chunk in data.chunks(7) {
        buf.extend_from_slice(chunk);
        while let Ok(Some(_frame)) = codec.decode(&mut buf) {}
    }
    let _ = codec.decode_eof(&mut buf);
});

#![no_main]

use bytes::BytesMut;
use fallback_gate::core::frame::FrameCodec;
use libfuzzer_sys::fuzz_target;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    let mut codec = FrameCodec::new(64 * 1024);
    let mut src = BytesMut::from(data);
    // Stop at the first error or incomplete frame
    while let Ok(Some(_frame)) = codec.decode(&mut src) {}
});

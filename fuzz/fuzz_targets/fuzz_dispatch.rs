#![no_main]

use bytes::Bytes;
use fallback_gate::protocol::dispatcher::Dispatcher;
use fallback_gate::protocol::registry::{packet_registry, ConnectionState};
use fallback_gate::protocol::version::ProtocolVersion;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&selector, frame)) = data.split_first() else {
        return;
    };
    let Ok(registry) = packet_registry() else {
        return;
    };
    let dispatcher = Dispatcher::new(registry);

    let versions = ProtocolVersion::ALL;
    let version = versions[usize::from(selector) % versions.len()];
    let state = if selector & 0x80 == 0 {
        ConnectionState::Play
    } else {
        ConnectionState::Login
    };
    let _ = dispatcher.dispatch(version, state, Bytes::copy_from_slice(frame));
});

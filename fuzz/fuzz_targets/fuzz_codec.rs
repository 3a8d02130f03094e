#![no_main]

use bytes::Bytes;
use fallback_gate::core::codec::{read_byte_array, read_string, read_var_int, read_var_long};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Readers must reject hostile input without panicking
    let _ = read_var_int(&mut Bytes::copy_from_slice(data));
    let _ = read_var_long(&mut Bytes::copy_from_slice(data));
    let _ = read_string(&mut Bytes::copy_from_slice(data), 256);
    let _ = read_byte_array(&mut Bytes::copy_from_slice(data), 4096);
});

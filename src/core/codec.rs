//! # Wire Codec
//!
//! Primitive encode/decode routines for the Minecraft wire format.
//!
//! Every reader works on a [`bytes::Buf`] and checks the readable length before
//! touching the buffer, so a hostile peer can never make the decoder panic or
//! allocate more than a declared cap. Writers work on a [`bytes::BufMut`].
//!
//! ## VarInt layout
//! ```text
//! [1vvvvvvv] [1vvvvvvv] ... [0vvvvvvv]   7 payload bits per byte, LSB group first
//! ```
//! A VarInt is at most 5 bytes, a VarLong at most 10.

use bytes::{Buf, BufMut, Bytes};
use uuid::Uuid;

use crate::error::{Malformed, ProtocolError, Result};

/// Default cap for byte arrays and strings read without an explicit bound
pub const DEFAULT_CAP: usize = i16::MAX as usize;

/// Maximum bytes in a VarInt
pub const MAX_VAR_INT_BYTES: usize = 5;

/// Maximum bytes in a VarLong
pub const MAX_VAR_LONG_BYTES: usize = 10;

/// Fail with `TruncatedInput` unless `needed` bytes are readable
#[inline]
pub fn ensure_readable(buf: &impl Buf, needed: usize) -> Result<()> {
    if buf.remaining() < needed {
        return Err(Malformed::TruncatedInput.into());
    }
    Ok(())
}

/// Number of bytes `value` occupies as a VarInt
#[inline]
pub fn var_int_bytes(value: i32) -> usize {
    let bits = 32 - (value as u32).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Number of bytes `value` occupies as a VarLong
#[inline]
pub fn var_long_bytes(value: i64) -> usize {
    let bits = 64 - (value as u64).leading_zeros() as usize;
    bits.div_ceil(7).max(1)
}

/// Read a VarInt.
///
/// # Errors
/// `EmptyBuffer` if nothing is readable, `MalformedVarInt` if the fifth byte still
/// carries a continuation bit or the buffer ends before a terminating byte.
pub fn read_var_int(buf: &mut impl Buf) -> Result<i32> {
    let readable = buf.remaining();
    if readable == 0 {
        return Err(Malformed::EmptyBuffer.into());
    }

    // Single byte values are by far the most common case
    let first = buf.get_u8();
    if first & 0x80 == 0 {
        return Ok(i32::from(first));
    }

    let max_read = readable.min(MAX_VAR_INT_BYTES);
    let mut value = u32::from(first & 0x7F);
    for shift in 1..max_read {
        let byte = buf.get_u8();
        value |= u32::from(byte & 0x7F) << (shift * 7);
        if byte & 0x80 == 0 {
            return Ok(value as i32);
        }
    }
    Err(Malformed::MalformedVarInt.into())
}

/// Write a VarInt using the minimal number of bytes.
#[inline]
pub fn write_var_int(buf: &mut impl BufMut, value: i32) {
    let value = value as u32;
    // Peel the one and two byte cases, they cover nearly every id and length we write
    if value & (u32::MAX << 7) == 0 {
        buf.put_u8(value as u8);
    } else if value & (u32::MAX << 14) == 0 {
        let w = ((value & 0x7F | 0x80) << 8) | (value >> 7);
        buf.put_u16(w as u16);
    } else {
        write_var_int_full(buf, value);
    }
}

fn write_var_int_full(buf: &mut impl BufMut, mut value: u32) {
    loop {
        if value & !0x7F == 0 {
            buf.put_u8(value as u8);
            return;
        }
        buf.put_u8((value & 0x7F | 0x80) as u8);
        value >>= 7;
    }
}

/// Read a VarLong.
///
/// # Errors
/// Same contract as [`read_var_int`] with a 10 byte limit.
pub fn read_var_long(buf: &mut impl Buf) -> Result<i64> {
    let readable = buf.remaining();
    if readable == 0 {
        return Err(Malformed::EmptyBuffer.into());
    }

    let max_read = readable.min(MAX_VAR_LONG_BYTES);
    let mut value = 0u64;
    for shift in 0..max_read {
        let byte = buf.get_u8();
        value |= u64::from(byte & 0x7F) << (shift * 7);
        if byte & 0x80 == 0 {
            return Ok(value as i64);
        }
    }
    Err(Malformed::MalformedVarInt.into())
}

/// Write a VarLong using the minimal number of bytes.
#[inline]
pub fn write_var_long(buf: &mut impl BufMut, value: i64) {
    let value = value as u64;
    if value & (u64::MAX << 7) == 0 {
        buf.put_u8(value as u8);
    } else if value & (u64::MAX << 14) == 0 {
        let w = ((value & 0x7F | 0x80) << 8) | (value >> 7);
        buf.put_u16(w as u16);
    } else {
        let mut value = value;
        loop {
            if value & !0x7F == 0 {
                buf.put_u8(value as u8);
                return;
            }
            buf.put_u8((value & 0x7F | 0x80) as u8);
            value >>= 7;
        }
    }
}

/// Read a VarInt length and check it against `cap` and the readable bytes
fn read_length(buf: &mut impl Buf, cap: usize) -> Result<usize> {
    let length = read_var_int(buf)?;
    check_length(buf, length, cap)
}

fn check_length(buf: &impl Buf, length: i32, cap: usize) -> Result<usize> {
    if length < 0 {
        return Err(Malformed::NegativeLength.into());
    }
    let length = length as usize;
    if length > cap {
        return Err(Malformed::LengthTooLarge.into());
    }
    ensure_readable(buf, length)?;
    Ok(length)
}

/// Read a VarInt length-prefixed byte array of at most `cap` bytes.
///
/// # Errors
/// `NegativeLength`, `LengthTooLarge` or `TruncatedInput`.
pub fn read_byte_array(buf: &mut impl Buf, cap: usize) -> Result<Bytes> {
    let length = read_length(buf, cap)?;
    Ok(buf.copy_to_bytes(length))
}

/// Write a VarInt length-prefixed byte array.
///
/// # Errors
/// `EncodingFailed` if the array is 32767 bytes or longer.
pub fn write_byte_array(buf: &mut impl BufMut, bytes: &[u8]) -> Result<()> {
    if bytes.len() >= DEFAULT_CAP {
        return Err(ProtocolError::EncodingFailed("byte array too long"));
    }
    write_var_int(buf, bytes.len() as i32);
    buf.put_slice(bytes);
    Ok(())
}

/// Read a VarInt length-prefixed UTF-8 string of at most `cap` characters.
///
/// The byte length is first bounded by `cap * 3` (the worst case UTF-8 expansion),
/// then the decoded character count is checked again: a byte bound alone lets
/// multi-byte sequences smuggle in more characters than bytes suggest or vice versa.
///
/// # Errors
/// `NegativeLength`, `LengthTooLarge`, `TruncatedInput`, `InvalidUtf8`, `StringTooLong`.
pub fn read_string(buf: &mut impl Buf, cap: usize) -> Result<String> {
    let length = read_var_int(buf)?;
    read_string_with_length(buf, cap, length)
}

/// Read a string whose length prefix has already been consumed.
pub fn read_string_with_length(buf: &mut impl Buf, cap: usize, length: i32) -> Result<String> {
    let length = check_length(buf, length, cap.saturating_mul(3))?;
    let mut raw = vec![0u8; length];
    buf.copy_to_slice(&mut raw);
    let text = String::from_utf8(raw).map_err(|_| Malformed::InvalidUtf8)?;
    // The peer counts characters in UTF-16 code units
    if text.encode_utf16().count() > cap {
        return Err(Malformed::StringTooLong.into());
    }
    Ok(text)
}

/// Write a VarInt length-prefixed UTF-8 string.
#[inline]
pub fn write_string(buf: &mut impl BufMut, text: &str) {
    write_var_int(buf, text.len() as i32);
    buf.put_slice(text.as_bytes());
}

/// Write a VarInt count followed by each string.
pub fn write_string_array<S: AsRef<str>>(buf: &mut impl BufMut, strings: &[S]) {
    write_var_int(buf, strings.len() as i32);
    for s in strings {
        write_string(buf, s.as_ref());
    }
}

/// Read a UUID as two big-endian 64-bit halves.
pub fn read_uuid(buf: &mut impl Buf) -> Result<Uuid> {
    ensure_readable(buf, 16)?;
    Ok(Uuid::from_u128(buf.get_u128()))
}

/// Write a UUID as two big-endian 64-bit halves.
#[inline]
pub fn write_uuid(buf: &mut impl BufMut, uuid: &Uuid) {
    buf.put_u128(uuid.as_u128());
}

/// Split a UUID into the four ints used by int-array encodings.
pub fn uuid_int_array(uuid: &Uuid) -> [i32; 4] {
    let value = uuid.as_u128();
    [
        (value >> 96) as i32,
        (value >> 64) as i32,
        (value >> 32) as i32,
        value as i32,
    ]
}

/// Write a UUID as four big-endian 32-bit ints.
pub fn write_uuid_int_array(buf: &mut impl BufMut, uuid: &Uuid) {
    for part in uuid_int_array(uuid) {
        buf.put_i32(part);
    }
}

/// Index of the highest set bit plus one, zero for an empty set
fn bit_length(words: &[u64]) -> usize {
    words
        .iter()
        .rposition(|&w| w != 0)
        .map_or(0, |i| i * 64 + (64 - words[i].leading_zeros() as usize))
}

/// Write a bit set of fixed `size` bits as `ceil(size / 8)` little-endian bytes.
///
/// `bits` holds the set as 64-bit words, bit `n` living in `bits[n / 64]`.
///
/// # Errors
/// `OversizedBitSet` if a bit at or above `size` is set.
pub fn write_fixed_bit_set(buf: &mut impl BufMut, bits: &[u64], size: usize) -> Result<()> {
    let len = bit_length(bits);
    if len > size {
        return Err(ProtocolError::OversizedBitSet { size, len });
    }
    let byte_count = size.div_ceil(8);
    for i in 0..byte_count {
        let word = bits.get(i / 8).copied().unwrap_or(0);
        buf.put_u8((word >> ((i % 8) * 8)) as u8);
    }
    Ok(())
}

/// Read a bit set of fixed `size` bits written by [`write_fixed_bit_set`].
pub fn read_fixed_bit_set(buf: &mut impl Buf, size: usize) -> Result<Vec<u64>> {
    let byte_count = size.div_ceil(8);
    ensure_readable(buf, byte_count)?;
    let mut words = vec![0u64; size.div_ceil(64)];
    for i in 0..byte_count {
        words[i / 8] |= u64::from(buf.get_u8()) << ((i % 8) * 8);
    }
    Ok(words)
}

/// Read the 15-bit short with optional high byte used by modded 1.7 clients.
pub fn read_extended_forge_short(buf: &mut impl Buf) -> Result<i32> {
    let mut low = i32::from(read_u16(buf)?);
    let mut high = 0;
    if low & 0x8000 != 0 {
        low &= 0x7FFF;
        high = i32::from(read_u8(buf)?);
    }
    Ok((high << 15) | low)
}

macro_rules! checked_reader {
    ($(#[$doc:meta])* $name:ident, $ty:ty, $get:ident) => {
        $(#[$doc])*
        #[inline]
        pub fn $name(buf: &mut impl Buf) -> Result<$ty> {
            ensure_readable(buf, std::mem::size_of::<$ty>())?;
            Ok(buf.$get())
        }
    };
}

checked_reader!(
    /// Read an unsigned byte
    read_u8, u8, get_u8
);
checked_reader!(
    /// Read a signed byte
    read_i8, i8, get_i8
);
checked_reader!(
    /// Read a big-endian unsigned short
    read_u16, u16, get_u16
);
checked_reader!(
    /// Read a big-endian short
    read_i16, i16, get_i16
);
checked_reader!(
    /// Read a big-endian int
    read_i32, i32, get_i32
);
checked_reader!(
    /// Read a big-endian long
    read_i64, i64, get_i64
);
checked_reader!(
    /// Read a big-endian float
    read_f32, f32, get_f32
);
checked_reader!(
    /// Read a big-endian double
    read_f64, f64, get_f64
);

/// Read a boolean byte. Any non-zero value is `true`.
#[inline]
pub fn read_bool(buf: &mut impl Buf) -> Result<bool> {
    Ok(read_u8(buf)? != 0)
}

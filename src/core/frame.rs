//! # Frame Codec
//!
//! Tokio codec that splits a byte stream into VarInt length-prefixed frames.
//!
//! ## Wire Format
//! ```text
//! [Length(VarInt)] [Packet id(VarInt)] [Body(N)]
//! ```
//!
//! The decoder never allocates more than `max_frame_size` for a single frame and
//! waits for more bytes without consuming anything while a frame is incomplete.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use tracing::trace;

use crate::core::codec::{var_int_bytes, write_var_int, MAX_VAR_INT_BYTES};
use crate::error::{Malformed, ProtocolError, Result};

/// Largest frame a vanilla client sends uncompressed (2 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 2 * 1024 * 1024;

/// Most a partial frame grows the read buffer by before its body arrives
const RESERVE_CHUNK: usize = 8 * 1024;

/// Length-prefixed frame codec
#[derive(Debug, Clone, Copy)]
pub struct FrameCodec {
    max_frame_size: usize,
}

impl Default for FrameCodec {
    fn default() -> Self {
        Self::new(DEFAULT_MAX_FRAME_SIZE)
    }
}

impl FrameCodec {
    pub fn new(max_frame_size: usize) -> Self {
        Self { max_frame_size }
    }

    pub fn max_frame_size(&self) -> usize {
        self.max_frame_size
    }
}

/// Peek a VarInt at the start of `src` without consuming it.
/// Returns `None` if more bytes are needed.
fn peek_var_int(src: &[u8]) -> Result<Option<(i32, usize)>> {
    let mut value = 0u32;
    for (i, byte) in src.iter().take(MAX_VAR_INT_BYTES).enumerate() {
        value |= u32::from(byte & 0x7F) << (i * 7);
        if byte & 0x80 == 0 {
            return Ok(Some((value as i32, i + 1)));
        }
    }
    if src.len() >= MAX_VAR_INT_BYTES {
        return Err(Malformed::MalformedVarInt.into());
    }
    Ok(None)
}

impl Decoder for FrameCodec {
    type Item = Bytes;
    type Error = ProtocolError;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>> {
        let Some((length, prefix)) = peek_var_int(src)? else {
            return Ok(None);
        };
        if length < 0 {
            return Err(Malformed::NegativeLength.into());
        }
        let length = length as usize;
        if length > self.max_frame_size {
            return Err(Malformed::LengthTooLarge.into());
        }

        if src.len() < prefix + length {
            let missing = prefix + length - src.len();
            src.reserve(missing.min(RESERVE_CHUNK));
            return Ok(None);
        }

        src.advance(prefix);
        let frame = src.split_to(length).freeze();
        trace!(length, "Decoded frame");
        Ok(Some(frame))
    }
}

impl Encoder<Bytes> for FrameCodec {
    type Error = ProtocolError;

    fn encode(&mut self, frame: Bytes, dst: &mut BytesMut) -> Result<()> {
        if frame.len() > self.max_frame_size {
            return Err(ProtocolError::EncodingFailed("frame too large"));
        }
        let length = frame.len() as i32;
        dst.reserve(var_int_bytes(length) + frame.len());
        write_var_int(dst, length);
        dst.put_slice(&frame);
        Ok(())
    }
}

//! # Core Wire Components
//!
//! Low-level primitives, structured payloads and stream framing.
//!
//! ## Components
//! - **Codec**: VarInt/VarLong, length-prefixed strings and arrays, UUIDs, bit sets
//! - **Nbt**: binary tag trees for item data and text components
//! - **Frame**: Tokio codec for VarInt length-prefixed frames
//!
//! ## Security
//! - Every length read from the peer is checked against a cap and the readable bytes
//! - Readers never panic on short buffers
//! - Frame size is bounded before any allocation

pub mod codec;
pub mod frame;
pub mod nbt;

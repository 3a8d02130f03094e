//! # Error Types
//!
//! Error handling for the fallback gate.
//!
//! ## Error Categories
//! - **Malformed input**: bad VarInts, oversized or negative lengths, truncated
//!   buffers, packets read in the wrong direction. Always attributable to the peer.
//! - **Encoding failures**: oversized bit sets, structured payloads that cannot
//!   be represented on the wire.
//! - **Resource exhaustion**: the CAPTCHA pool ran dry.
//! - **Configuration errors**: invalid settings or inconsistent revision tables,
//!   raised while the gate is being built.
//!
//! Malformed input never carries text. The [`Malformed`] kind is a copyable tag,
//! and its `Display` collapses to a single fixed string unless debug traces are
//! enabled, so nothing about *why* decoding failed leaks to a probing peer.
//!
//! ## Example Usage
//! ```rust
//! use bytes::Bytes;
//! use fallback_gate::core::codec::read_var_int;
//! use fallback_gate::error::{Malformed, ProtocolError};
//!
//! let mut buf = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
//! match read_var_int(&mut buf) {
//!     Err(ProtocolError::Malformed(kind)) => assert_eq!(kind, Malformed::MalformedVarInt),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

use std::io;
use std::sync::atomic::{AtomicBool, Ordering};
use thiserror::Error;

/// Error message constants. Static strings keep error paths allocation free.
pub mod constants {
    /// Shown for every malformed packet unless debug traces are enabled
    pub const ERR_QUIET: &str = "Malformed packet";

    /// Codec errors (debug traces only)
    pub const ERR_EMPTY_BUFFER: &str = "Empty buffer";
    pub const ERR_BAD_VAR_INT: &str = "Bad VarInt";
    pub const ERR_NEGATIVE_LENGTH: &str = "Got a negative length";
    pub const ERR_LENGTH_TOO_LARGE: &str = "Declared length exceeds the cap";
    pub const ERR_TRUNCATED: &str = "Declared length exceeds the readable bytes";
    pub const ERR_INVALID_UTF8: &str = "String is not valid UTF-8";
    pub const ERR_STRING_TOO_LONG: &str = "Got a too-long string";

    /// Packet model errors (debug traces only)
    pub const ERR_UNSUPPORTED_DIRECTION: &str = "Packet does not support this direction";
    pub const ERR_UNKNOWN_PACKET: &str = "Unknown packet id";
    pub const ERR_TRAILING_BYTES: &str = "Packet has trailing bytes";

    /// Structured payload errors
    pub const ERR_TAG_STRING_TOO_LONG: &str = "Tag string exceeds 65535 encoded bytes";
    pub const ERR_TAG_LIST_MIXED: &str = "Tag list elements have different types";
    pub const ERR_TAG_LENGTH: &str = "Tag array or list is too long";
    pub const ERR_COMPONENT_JSON: &str = "Unable to serialize text component";
    pub const ERR_MAP_DATA_SHAPE: &str = "Map colour buffer does not match columns x rows";
    pub const ERR_LEGACY_MAP_COLUMN: &str = "1.7 map data must be sent one column at a time";
}

static DEBUG_TRACES: AtomicBool = AtomicBool::new(false);

/// Enable or disable descriptive malformed-packet errors.
///
/// Leave this off in production: error text is a signal to whoever is probing the decoder.
pub fn set_debug_traces(enabled: bool) {
    DEBUG_TRACES.store(enabled, Ordering::Relaxed);
}

/// Whether descriptive malformed-packet errors are enabled
pub fn debug_traces() -> bool {
    DEBUG_TRACES.load(Ordering::Relaxed)
}

/// Why a peer's bytes were rejected
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Malformed {
    EmptyBuffer,
    MalformedVarInt,
    NegativeLength,
    LengthTooLarge,
    TruncatedInput,
    InvalidUtf8,
    StringTooLong,
    UnsupportedDirection,
    UnknownPacket,
    TrailingBytes,
}

impl Malformed {
    /// Human readable description (only surfaced with debug traces enabled)
    pub fn detail(self) -> &'static str {
        match self {
            Malformed::EmptyBuffer => constants::ERR_EMPTY_BUFFER,
            Malformed::MalformedVarInt => constants::ERR_BAD_VAR_INT,
            Malformed::NegativeLength => constants::ERR_NEGATIVE_LENGTH,
            Malformed::LengthTooLarge => constants::ERR_LENGTH_TOO_LARGE,
            Malformed::TruncatedInput => constants::ERR_TRUNCATED,
            Malformed::InvalidUtf8 => constants::ERR_INVALID_UTF8,
            Malformed::StringTooLong => constants::ERR_STRING_TOO_LONG,
            Malformed::UnsupportedDirection => constants::ERR_UNSUPPORTED_DIRECTION,
            Malformed::UnknownPacket => constants::ERR_UNKNOWN_PACKET,
            Malformed::TrailingBytes => constants::ERR_TRAILING_BYTES,
        }
    }

    fn describe(self) -> &'static str {
        if debug_traces() {
            self.detail()
        } else {
            constants::ERR_QUIET
        }
    }
}

// ProtocolError is the primary error type for all gate operations
#[derive(Error, Debug)]
pub enum ProtocolError {
    #[error("{}", .0.describe())]
    Malformed(Malformed),

    #[error("BitSet too large (expected at most {size} bits, got {len})")]
    OversizedBitSet { size: usize, len: usize },

    #[error("Unable to encode structured payload: {0}")]
    EncodingFailed(&'static str),

    #[error("No CAPTCHA available")]
    PoolExhausted,

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Connection closed")]
    ConnectionClosed,
}

impl ProtocolError {
    /// True if the error was caused by bytes received from the peer
    pub fn is_malformed(&self) -> bool {
        matches!(self, ProtocolError::Malformed(_))
    }
}

impl From<Malformed> for ProtocolError {
    fn from(kind: Malformed) -> Self {
        ProtocolError::Malformed(kind)
    }
}

/// Type alias for Results using ProtocolError
pub type Result<T> = std::result::Result<T, ProtocolError>;

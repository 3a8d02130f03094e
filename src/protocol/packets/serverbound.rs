use bytes::Buf;

use crate::core::codec::{
    ensure_readable, read_bool, read_byte_array, read_f32, read_f64, read_fixed_bit_set, read_i32,
    read_i64, read_string, read_uuid, read_var_int,
};
use crate::error::{Malformed, Result};
use crate::protocol::packets::Packet;
use crate::protocol::registry::PacketKind;
use crate::protocol::version::ProtocolVersion;

const MAX_LEGACY_MESSAGE_LENGTH: usize = 100;
const MAX_MESSAGE_LENGTH: usize = 256;
const MAX_SIGNATURE_LENGTH: usize = 256;
const MAX_LAST_SEEN_ENTRIES: i32 = 5;
const SIGNATURE_BYTES: usize = 256;
const ACKNOWLEDGED_BITS: usize = 20;

/// Chat line typed by the player
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatMessage {
    pub message: String,
}

impl Packet for ChatMessage {
    const KIND: PacketKind = PacketKind::ChatMessage;

    fn decode<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        let cap = if version >= ProtocolVersion::V1_11 {
            MAX_MESSAGE_LENGTH
        } else {
            MAX_LEGACY_MESSAGE_LENGTH
        };
        let message = read_string(buf, cap)?;

        if version >= ProtocolVersion::V1_19 {
            read_i64(buf)?; // timestamp
            read_i64(buf)?; // salt
            skip_signature_data(buf, version)?;
        }

        Ok(Self { message })
    }
}

/// Signed chat trailers. Their shape changed on every release from 1.19 to 1.19.3.
fn skip_signature_data<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<()> {
    if version >= ProtocolVersion::V1_19_3 {
        if read_bool(buf)? {
            ensure_readable(buf, SIGNATURE_BYTES)?;
            buf.advance(SIGNATURE_BYTES);
        }
        read_var_int(buf)?;
        read_fixed_bit_set(buf, ACKNOWLEDGED_BITS)?;
        return Ok(());
    }

    read_byte_array(buf, MAX_SIGNATURE_LENGTH)?;
    read_bool(buf)?; // signed preview

    if version >= ProtocolVersion::V1_19_1 {
        let entries = read_var_int(buf)?;
        if entries < 0 {
            return Err(Malformed::NegativeLength.into());
        }
        if entries > MAX_LAST_SEEN_ENTRIES {
            return Err(Malformed::LengthTooLarge.into());
        }
        for _ in 0..entries {
            read_uuid(buf)?;
            read_byte_array(buf, MAX_SIGNATURE_LENGTH)?;
        }
        if read_bool(buf)? {
            read_uuid(buf)?;
            read_byte_array(buf, MAX_SIGNATURE_LENGTH)?;
        }
    }
    Ok(())
}

/// Absolute position update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPlayerPosition {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub on_ground: bool,
}

/// Read `x, y, z`, skipping the stance value 1.7 sends after `y`
fn read_coordinates<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<(f64, f64, f64)> {
    let x = read_f64(buf)?;
    let y = read_f64(buf)?;
    if version < ProtocolVersion::V1_8 {
        read_f64(buf)?;
    }
    let z = read_f64(buf)?;
    Ok((x, y, z))
}

impl Packet for SetPlayerPosition {
    const KIND: PacketKind = PacketKind::SetPlayerPosition;

    fn decode<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        let (x, y, z) = read_coordinates(buf, version)?;
        let on_ground = read_bool(buf)?;
        Ok(Self { x, y, z, on_ground })
    }
}

/// Absolute position and look update
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetPlayerPositionRotation {
    pub x: f64,
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    pub on_ground: bool,
}

impl Packet for SetPlayerPositionRotation {
    const KIND: PacketKind = PacketKind::SetPlayerPositionRotation;

    fn decode<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        let (x, y, z) = read_coordinates(buf, version)?;
        let yaw = read_f32(buf)?;
        let pitch = read_f32(buf)?;
        let on_ground = read_bool(buf)?;
        Ok(Self {
            x,
            y,
            z,
            yaw,
            pitch,
            on_ground,
        })
    }
}

/// Reply to a keep-alive ping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAliveResponse {
    pub id: i64,
}

impl Packet for KeepAliveResponse {
    const KIND: PacketKind = PacketKind::KeepAliveResponse;

    fn decode<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        let id = if version >= ProtocolVersion::V1_12_2 {
            read_i64(buf)?
        } else if version >= ProtocolVersion::V1_8 {
            i64::from(read_var_int(buf)?)
        } else {
            i64::from(read_i32(buf)?)
        };
        Ok(Self { id })
    }
}

use bytes::Buf;
use uuid::Uuid;

use crate::core::codec::{read_bool, read_byte_array, read_i64, read_string, read_uuid};
use crate::error::Result;
use crate::protocol::packets::Packet;
use crate::protocol::registry::PacketKind;
use crate::protocol::version::ProtocolVersion;

/// Longest username a client may send
pub const MAX_USERNAME_LENGTH: usize = 16;

const MAX_PUBLIC_KEY_LENGTH: usize = 32767;
const MAX_KEY_SIGNATURE_LENGTH: usize = 4096;

/// First packet of the login state, announcing the player's name
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginStart {
    pub username: String,
    pub uuid: Option<Uuid>,
}

impl Packet for LoginStart {
    const KIND: PacketKind = PacketKind::LoginStart;

    fn decode<B: Buf>(buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        let username = read_string(buf, MAX_USERNAME_LENGTH)?;

        // 1.19 to 1.19.2 may attach the profile key, which the gate has no use for
        if version >= ProtocolVersion::V1_19 && version < ProtocolVersion::V1_19_3 && read_bool(buf)? {
            read_i64(buf)?;
            read_byte_array(buf, MAX_PUBLIC_KEY_LENGTH)?;
            read_byte_array(buf, MAX_KEY_SIGNATURE_LENGTH)?;
        }

        let uuid = if version >= ProtocolVersion::V1_20_2 {
            Some(read_uuid(buf)?)
        } else if version >= ProtocolVersion::V1_19_1 && read_bool(buf)? {
            Some(read_uuid(buf)?)
        } else {
            None
        };

        Ok(Self { username, uuid })
    }
}

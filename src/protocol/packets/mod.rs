//! # Packet Model
//!
//! Typed packets for the verification flow. Every packet knows one direction:
//! inbound packets decode, outbound packets encode, and the other half fails
//! with [`Malformed::UnsupportedDirection`].
//!
//! Field layout differs between revisions. Every branch is taken on the
//! negotiated [`ProtocolVersion`], never on buffer contents.

pub mod clientbound;
pub mod login;
pub mod serverbound;

use bytes::{Buf, BufMut, BytesMut};

use crate::core::codec::write_var_int;
use crate::error::{Malformed, Result};
use crate::protocol::registry::{packet_registry, PacketKind};
use crate::protocol::version::ProtocolVersion;

pub use clientbound::{
    KeepAlive, MapData, PlayerAbilities, SetContainerSlot, SetExperience, SynchronizePosition,
    SystemChat,
};
pub use login::LoginStart;
pub use serverbound::{ChatMessage, KeepAliveResponse, SetPlayerPosition, SetPlayerPositionRotation};

/// A packet body with a fixed kind
pub trait Packet: Sized {
    const KIND: PacketKind;

    /// Read the body (the id has already been consumed).
    fn decode<B: Buf>(_buf: &mut B, _version: ProtocolVersion) -> Result<Self> {
        Err(Malformed::UnsupportedDirection.into())
    }

    /// Write the body (without the id).
    fn encode<B: BufMut>(&self, _buf: &mut B, _version: ProtocolVersion) -> Result<()> {
        Err(Malformed::UnsupportedDirection.into())
    }
}

/// Packets the gate reads from the client
#[derive(Debug, Clone, PartialEq)]
pub enum ServerboundPacket {
    LoginStart(LoginStart),
    ChatMessage(ChatMessage),
    SetPlayerPosition(SetPlayerPosition),
    SetPlayerPositionRotation(SetPlayerPositionRotation),
    KeepAliveResponse(KeepAliveResponse),
}

impl ServerboundPacket {
    pub fn kind(&self) -> PacketKind {
        match self {
            ServerboundPacket::LoginStart(_) => LoginStart::KIND,
            ServerboundPacket::ChatMessage(_) => ChatMessage::KIND,
            ServerboundPacket::SetPlayerPosition(_) => SetPlayerPosition::KIND,
            ServerboundPacket::SetPlayerPositionRotation(_) => SetPlayerPositionRotation::KIND,
            ServerboundPacket::KeepAliveResponse(_) => KeepAliveResponse::KIND,
        }
    }

    /// Decode the body of a packet of `kind`.
    ///
    /// # Errors
    /// `UnsupportedDirection` for clientbound kinds, otherwise whatever the body decoder raises.
    pub fn decode<B: Buf>(kind: PacketKind, buf: &mut B, version: ProtocolVersion) -> Result<Self> {
        Ok(match kind {
            PacketKind::LoginStart => ServerboundPacket::LoginStart(LoginStart::decode(buf, version)?),
            PacketKind::ChatMessage => {
                ServerboundPacket::ChatMessage(ChatMessage::decode(buf, version)?)
            }
            PacketKind::SetPlayerPosition => {
                ServerboundPacket::SetPlayerPosition(SetPlayerPosition::decode(buf, version)?)
            }
            PacketKind::SetPlayerPositionRotation => ServerboundPacket::SetPlayerPositionRotation(
                SetPlayerPositionRotation::decode(buf, version)?,
            ),
            PacketKind::KeepAliveResponse => {
                ServerboundPacket::KeepAliveResponse(KeepAliveResponse::decode(buf, version)?)
            }
            PacketKind::KeepAlive
            | PacketKind::SetContainerSlot
            | PacketKind::MapData
            | PacketKind::PlayerAbilities
            | PacketKind::SynchronizePosition
            | PacketKind::SystemChat
            | PacketKind::SetExperience => return Err(Malformed::UnsupportedDirection.into()),
        })
    }

    /// True for either position update
    pub fn is_position(&self) -> bool {
        matches!(
            self,
            ServerboundPacket::SetPlayerPosition(_) | ServerboundPacket::SetPlayerPositionRotation(_)
        )
    }
}

/// Packets the gate writes to the client
#[derive(Debug, Clone, PartialEq)]
pub enum ClientboundPacket {
    KeepAlive(KeepAlive),
    SetContainerSlot(SetContainerSlot),
    MapData(MapData),
    PlayerAbilities(PlayerAbilities),
    SynchronizePosition(SynchronizePosition),
    SystemChat(SystemChat),
    SetExperience(SetExperience),
}

impl ClientboundPacket {
    pub fn kind(&self) -> PacketKind {
        match self {
            ClientboundPacket::KeepAlive(_) => KeepAlive::KIND,
            ClientboundPacket::SetContainerSlot(_) => SetContainerSlot::KIND,
            ClientboundPacket::MapData(_) => MapData::KIND,
            ClientboundPacket::PlayerAbilities(_) => PlayerAbilities::KIND,
            ClientboundPacket::SynchronizePosition(_) => SynchronizePosition::KIND,
            ClientboundPacket::SystemChat(_) => SystemChat::KIND,
            ClientboundPacket::SetExperience(_) => SetExperience::KIND,
        }
    }

    /// Write the body without the packet id
    pub fn encode_body<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        match self {
            ClientboundPacket::KeepAlive(p) => p.encode(buf, version),
            ClientboundPacket::SetContainerSlot(p) => p.encode(buf, version),
            ClientboundPacket::MapData(p) => p.encode(buf, version),
            ClientboundPacket::PlayerAbilities(p) => p.encode(buf, version),
            ClientboundPacket::SynchronizePosition(p) => p.encode(buf, version),
            ClientboundPacket::SystemChat(p) => p.encode(buf, version),
            ClientboundPacket::SetExperience(p) => p.encode(buf, version),
        }
    }
}

macro_rules! impl_from_packet {
    ($target:ident: $($variant:ident),+) => {
        $(
            impl From<$variant> for $target {
                fn from(packet: $variant) -> Self {
                    $target::$variant(packet)
                }
            }
        )+
    };
}

impl_from_packet!(ServerboundPacket: LoginStart, ChatMessage, SetPlayerPosition, SetPlayerPositionRotation, KeepAliveResponse);
impl_from_packet!(ClientboundPacket: KeepAlive, SetContainerSlot, MapData, PlayerAbilities, SynchronizePosition, SystemChat, SetExperience);

/// Encode `packet` as `[id(VarInt)] [body]`, ready to be framed.
///
/// # Example
/// ```rust
/// use fallback_gate::protocol::packets::{encode_packet, ClientboundPacket, KeepAlive};
/// use fallback_gate::protocol::version::ProtocolVersion;
///
/// let packet = ClientboundPacket::from(KeepAlive { id: 7 });
/// let bytes = encode_packet(&packet, ProtocolVersion::V1_8).unwrap();
/// assert_eq!(&bytes[..], &[0x00, 0x07]);
/// ```
pub fn encode_packet(packet: &ClientboundPacket, version: ProtocolVersion) -> Result<BytesMut> {
    let id = packet_registry()?.id(packet.kind(), version);
    let mut buf = BytesMut::with_capacity(64);
    write_var_int(&mut buf, id);
    packet.encode_body(&mut buf, version)?;
    Ok(buf)
}

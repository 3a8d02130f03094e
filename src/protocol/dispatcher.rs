use std::collections::HashMap;

use bytes::{Buf, Bytes};
use tracing::trace;

use crate::core::codec::read_var_int;
use crate::error::{Malformed, Result};
use crate::protocol::packets::ServerboundPacket;
use crate::protocol::registry::{ConnectionState, Direction, PacketKind, PacketRegistry};
use crate::protocol::version::ProtocolVersion;

type DecodeFn = fn(&mut Bytes, ProtocolVersion) -> Result<ServerboundPacket>;

/// Result of routing one inbound frame
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    Packet(ServerboundPacket),
    /// A play packet the gate does not inspect
    Ignored { id: i32 },
}

/// Inbound frame router.
///
/// Maps `(state, packet id)` to a body decoder separately for every revision.
/// Built once from the [`PacketRegistry`] and read-only afterwards.
pub struct Dispatcher {
    // Indexed by ProtocolVersion::ordinal
    routes: Vec<HashMap<(ConnectionState, i32), DecodeFn>>,
}

impl Dispatcher {
    pub fn new(registry: &PacketRegistry) -> Self {
        let routes = ProtocolVersion::ALL
            .iter()
            .map(|&version| {
                PacketKind::ALL
                    .iter()
                    .filter(|kind| kind.direction() == Direction::Serverbound)
                    .map(|&kind| {
                        let key = (kind.state(), registry.id(kind, version));
                        (key, decoder_for(kind))
                    })
                    .collect()
            })
            .collect();
        Self { routes }
    }

    /// Decode one frame (`[id] [body]`) received in `state`.
    ///
    /// # Errors
    /// Malformed ids, unknown login packets, body decode failures, and bytes
    /// left over after a known body.
    pub fn dispatch(
        &self,
        version: ProtocolVersion,
        state: ConnectionState,
        mut frame: Bytes,
    ) -> Result<Inbound> {
        let id = read_var_int(&mut frame)?;

        let Some(decode) = self.routes[version.ordinal()].get(&(state, id)) else {
            return match state {
                ConnectionState::Play => {
                    trace!(id, "Ignoring unhandled play packet");
                    Ok(Inbound::Ignored { id })
                }
                ConnectionState::Login => Err(Malformed::UnknownPacket.into()),
            };
        };

        let packet = decode(&mut frame, version)?;
        if frame.has_remaining() {
            return Err(Malformed::TrailingBytes.into());
        }
        Ok(Inbound::Packet(packet))
    }
}

macro_rules! decoders {
    ($($kind:ident),+) => {
        fn decoder_for(kind: PacketKind) -> DecodeFn {
            match kind {
                $(PacketKind::$kind => |buf, version| ServerboundPacket::decode(PacketKind::$kind, buf, version),)+
                // Clientbound kinds never get a route
                _ => |_, _| Err(Malformed::UnsupportedDirection.into()),
            }
        }
    };
}

decoders!(
    LoginStart,
    ChatMessage,
    SetPlayerPosition,
    SetPlayerPositionRotation,
    KeepAliveResponse
);

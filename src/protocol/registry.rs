//! Packet ids per revision.
//!
//! Packet ids shift whenever a release inserts a packet. Instead of switch tables
//! inside each packet, every kind owns an [`IdTable`] validated at startup.

use once_cell::sync::OnceCell;

use crate::error::Result;
use crate::id_table;
use crate::protocol::resource::IdTable;
use crate::protocol::version::ProtocolVersion;

/// Connection state a packet belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    Login,
    Play,
}

/// Which side sends a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Direction {
    Serverbound,
    Clientbound,
}

/// Every packet kind the challenge flow sends or receives
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PacketKind {
    LoginStart,
    ChatMessage,
    SetPlayerPosition,
    SetPlayerPositionRotation,
    KeepAliveResponse,
    KeepAlive,
    SetContainerSlot,
    MapData,
    PlayerAbilities,
    SynchronizePosition,
    SystemChat,
    SetExperience,
}

impl PacketKind {
    pub const ALL: &'static [PacketKind] = &[
        PacketKind::LoginStart,
        PacketKind::ChatMessage,
        PacketKind::SetPlayerPosition,
        PacketKind::SetPlayerPositionRotation,
        PacketKind::KeepAliveResponse,
        PacketKind::KeepAlive,
        PacketKind::SetContainerSlot,
        PacketKind::MapData,
        PacketKind::PlayerAbilities,
        PacketKind::SynchronizePosition,
        PacketKind::SystemChat,
        PacketKind::SetExperience,
    ];

    pub fn direction(self) -> Direction {
        match self {
            PacketKind::LoginStart
            | PacketKind::ChatMessage
            | PacketKind::SetPlayerPosition
            | PacketKind::SetPlayerPositionRotation
            | PacketKind::KeepAliveResponse => Direction::Serverbound,
            PacketKind::KeepAlive
            | PacketKind::SetContainerSlot
            | PacketKind::MapData
            | PacketKind::PlayerAbilities
            | PacketKind::SynchronizePosition
            | PacketKind::SystemChat
            | PacketKind::SetExperience => Direction::Clientbound,
        }
    }

    pub fn state(self) -> ConnectionState {
        match self {
            PacketKind::LoginStart => ConnectionState::Login,
            _ => ConnectionState::Play,
        }
    }
}

/// Packet id tables for every [`PacketKind`]
#[derive(Debug, Clone)]
pub struct PacketRegistry {
    // Indexed by PacketKind discriminant
    tables: Vec<IdTable>,
}

impl PacketRegistry {
    /// Build and validate the standard id tables.
    pub fn standard() -> Result<Self> {
        let tables = vec![
            IdTable::constant("login_start", 0x00),
            id_table!("chat_message";
                V1_7_2..=V1_8 => 0x01,
                V1_9..=V1_11_1 => 0x02,
                V1_12..=V1_12 => 0x03,
                V1_12_1..=V1_13_2 => 0x02,
                V1_14..=V1_18_2 => 0x03,
                V1_19..=V1_19 => 0x04,
                V1_19_1..=V1_20_3 => 0x05,
                V1_20_5..=V1_21 => 0x06,
            )?,
            id_table!("set_player_position";
                V1_7_2..=V1_8 => 0x04,
                V1_9..=V1_11_1 => 0x0C,
                V1_12..=V1_12 => 0x0E,
                V1_12_1..=V1_12_2 => 0x0D,
                V1_13..=V1_13_2 => 0x10,
                V1_14..=V1_15_2 => 0x11,
                V1_16..=V1_16_4 => 0x12,
                V1_17..=V1_18_2 => 0x11,
                V1_19..=V1_19 => 0x13,
                V1_19_1..=V1_19_1 => 0x14,
                V1_19_3..=V1_19_3 => 0x13,
                V1_19_4..=V1_20 => 0x14,
                V1_20_2..=V1_20_2 => 0x16,
                V1_20_3..=V1_20_3 => 0x17,
                V1_20_5..=V1_21 => 0x1A,
            )?,
            id_table!("set_player_position_rotation";
                V1_7_2..=V1_8 => 0x06,
                V1_9..=V1_11_1 => 0x0D,
                V1_12..=V1_12 => 0x0F,
                V1_12_1..=V1_12_2 => 0x0E,
                V1_13..=V1_13_2 => 0x11,
                V1_14..=V1_15_2 => 0x12,
                V1_16..=V1_16_4 => 0x13,
                V1_17..=V1_18_2 => 0x12,
                V1_19..=V1_19 => 0x14,
                V1_19_1..=V1_19_1 => 0x15,
                V1_19_3..=V1_19_3 => 0x14,
                V1_19_4..=V1_20 => 0x15,
                V1_20_2..=V1_20_2 => 0x17,
                V1_20_3..=V1_20_3 => 0x18,
                V1_20_5..=V1_21 => 0x1B,
            )?,
            id_table!("keep_alive_response";
                V1_7_2..=V1_8 => 0x00,
                V1_9..=V1_11_1 => 0x0B,
                V1_12..=V1_12 => 0x0C,
                V1_12_1..=V1_12_2 => 0x0B,
                V1_13..=V1_13_2 => 0x0E,
                V1_14..=V1_15_2 => 0x0F,
                V1_16..=V1_16_4 => 0x10,
                V1_17..=V1_18_2 => 0x0F,
                V1_19..=V1_19 => 0x11,
                V1_19_1..=V1_19_1 => 0x12,
                V1_19_3..=V1_19_3 => 0x11,
                V1_19_4..=V1_20 => 0x12,
                V1_20_2..=V1_20_2 => 0x14,
                V1_20_3..=V1_20_3 => 0x15,
                V1_20_5..=V1_21 => 0x18,
            )?,
            id_table!("keep_alive";
                V1_7_2..=V1_8 => 0x00,
                V1_9..=V1_12_2 => 0x1F,
                V1_13..=V1_13_2 => 0x21,
                V1_14..=V1_14_4 => 0x20,
                V1_15..=V1_15_2 => 0x21,
                V1_16..=V1_16_1 => 0x20,
                V1_16_2..=V1_16_4 => 0x1F,
                V1_17..=V1_18_2 => 0x21,
                V1_19..=V1_19 => 0x1E,
                V1_19_1..=V1_19_1 => 0x20,
                V1_19_3..=V1_19_3 => 0x1F,
                V1_19_4..=V1_20 => 0x23,
                V1_20_2..=V1_20_3 => 0x24,
                V1_20_5..=V1_21 => 0x26,
            )?,
            id_table!("set_container_slot";
                V1_7_2..=V1_8 => 0x2F,
                V1_9..=V1_12_2 => 0x16,
                V1_13..=V1_13_2 => 0x17,
                V1_14..=V1_14_4 => 0x16,
                V1_15..=V1_15_2 => 0x17,
                V1_16..=V1_16_1 => 0x16,
                V1_16_2..=V1_16_4 => 0x15,
                V1_17..=V1_18_2 => 0x16,
                V1_19..=V1_19_1 => 0x13,
                V1_19_3..=V1_19_3 => 0x12,
                V1_19_4..=V1_20 => 0x14,
                V1_20_2..=V1_21 => 0x15,
            )?,
            id_table!("map_data";
                V1_7_2..=V1_8 => 0x34,
                V1_9..=V1_12_2 => 0x24,
                V1_13..=V1_14_4 => 0x26,
                V1_15..=V1_15_2 => 0x27,
                V1_16..=V1_16_1 => 0x26,
                V1_16_2..=V1_16_4 => 0x25,
                V1_17..=V1_18_2 => 0x27,
                V1_19..=V1_19 => 0x24,
                V1_19_1..=V1_19_1 => 0x26,
                V1_19_3..=V1_19_3 => 0x25,
                V1_19_4..=V1_20 => 0x29,
                V1_20_2..=V1_20_3 => 0x2A,
                V1_20_5..=V1_21 => 0x2C,
            )?,
            id_table!("player_abilities";
                V1_7_2..=V1_8 => 0x39,
                V1_9..=V1_12 => 0x2B,
                V1_12_1..=V1_12_2 => 0x2C,
                V1_13..=V1_13_2 => 0x2E,
                V1_14..=V1_14_4 => 0x31,
                V1_15..=V1_15_2 => 0x32,
                V1_16..=V1_16_1 => 0x31,
                V1_16_2..=V1_16_4 => 0x30,
                V1_17..=V1_18_2 => 0x32,
                V1_19..=V1_19 => 0x2F,
                V1_19_1..=V1_19_1 => 0x31,
                V1_19_3..=V1_19_3 => 0x30,
                V1_19_4..=V1_20 => 0x34,
                V1_20_2..=V1_20_3 => 0x36,
                V1_20_5..=V1_21 => 0x38,
            )?,
            id_table!("synchronize_position";
                V1_7_2..=V1_8 => 0x08,
                V1_9..=V1_12 => 0x2E,
                V1_12_1..=V1_12_2 => 0x2F,
                V1_13..=V1_13_2 => 0x32,
                V1_14..=V1_14_4 => 0x35,
                V1_15..=V1_15_2 => 0x36,
                V1_16..=V1_16_1 => 0x35,
                V1_16_2..=V1_16_4 => 0x34,
                V1_17..=V1_18_2 => 0x38,
                V1_19..=V1_19 => 0x36,
                V1_19_1..=V1_19_1 => 0x39,
                V1_19_3..=V1_19_3 => 0x38,
                V1_19_4..=V1_20 => 0x3C,
                V1_20_2..=V1_20_3 => 0x3E,
                V1_20_5..=V1_21 => 0x40,
            )?,
            id_table!("system_chat";
                V1_7_2..=V1_8 => 0x02,
                V1_9..=V1_12_2 => 0x0F,
                V1_13..=V1_14_4 => 0x0E,
                V1_15..=V1_15_2 => 0x0F,
                V1_16..=V1_16_4 => 0x0E,
                V1_17..=V1_18_2 => 0x0F,
                V1_19..=V1_19 => 0x5F,
                V1_19_1..=V1_19_1 => 0x62,
                V1_19_3..=V1_19_3 => 0x60,
                V1_19_4..=V1_20 => 0x64,
                V1_20_2..=V1_20_2 => 0x67,
                V1_20_3..=V1_20_3 => 0x69,
                V1_20_5..=V1_21 => 0x6C,
            )?,
            id_table!("set_experience";
                V1_7_2..=V1_8 => 0x1F,
                V1_9..=V1_11_1 => 0x3D,
                V1_12..=V1_12 => 0x3F,
                V1_12_1..=V1_12_2 => 0x40,
                V1_13..=V1_13_2 => 0x43,
                V1_14..=V1_14_4 => 0x47,
                V1_15..=V1_16_4 => 0x48,
                V1_17..=V1_18_2 => 0x51,
                V1_19..=V1_19 => 0x54,
                V1_19_1..=V1_19_1 => 0x56,
                V1_19_3..=V1_19_3 => 0x54,
                V1_19_4..=V1_20 => 0x58,
                V1_20_2..=V1_20_2 => 0x5A,
                V1_20_3..=V1_20_3 => 0x5C,
                V1_20_5..=V1_21 => 0x5E,
            )?,
        ];
        Ok(Self { tables })
    }

    /// Packet id of `kind` on `version`
    #[inline]
    pub fn id(&self, kind: PacketKind, version: ProtocolVersion) -> i32 {
        self.tables[kind as usize].resolve(version)
    }

    /// Find the serverbound kind with `id` in `state` on `version`
    pub fn serverbound_kind(
        &self,
        state: ConnectionState,
        id: i32,
        version: ProtocolVersion,
    ) -> Option<PacketKind> {
        PacketKind::ALL.iter().copied().find(|&kind| {
            kind.direction() == Direction::Serverbound
                && kind.state() == state
                && self.id(kind, version) == id
        })
    }
}

static REGISTRY: OnceCell<PacketRegistry> = OnceCell::new();

/// Process-wide registry, built and validated on first use
pub fn packet_registry() -> Result<&'static PacketRegistry> {
    REGISTRY.get_or_try_init(PacketRegistry::standard)
}

use std::sync::Arc;

use bytes::BufMut;
use uuid::Uuid;

use crate::core::codec::{write_uuid, write_var_int};
use crate::core::nbt::{write_compound_tag, write_structured_payload, Compound, Tag};
use crate::error::{constants, ProtocolError, Result};
use crate::protocol::component::Component;
use crate::protocol::packets::Packet;
use crate::protocol::registry::PacketKind;
use crate::protocol::version::ProtocolVersion;

/// Side length of a map canvas in pixels
pub const MAP_SIZE: u8 = 128;

/// Eye height 1.7 clients expect in the teleport `y` field
const EYE_HEIGHT: f64 = 1.62;

/// Data component id of `minecraft:map_id` (1.20.5+)
const MAP_ID_COMPONENT: i32 = 26;

/// Keep-alive ping
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeepAlive {
    pub id: i64,
}

impl Packet for KeepAlive {
    const KIND: PacketKind = PacketKind::KeepAlive;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        if version >= ProtocolVersion::V1_12_2 {
            buf.put_i64(self.id);
        } else if version >= ProtocolVersion::V1_8 {
            write_var_int(buf, self.id as i32);
        } else {
            buf.put_i32(self.id as i32);
        }
        Ok(())
    }
}

/// Put a filled map into one inventory slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SetContainerSlot {
    pub window_id: i8,
    pub state_id: i32,
    pub slot: i16,
    pub count: u8,
    /// Filled map item id for the target revision
    pub item_id: i32,
    pub map_id: i32,
}

impl SetContainerSlot {
    fn map_tag(&self) -> Compound {
        Compound::new().with("map", Tag::Int(self.map_id))
    }

    fn write_legacy_item<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        if self.count == 0 {
            buf.put_i16(-1);
            return Ok(());
        }
        buf.put_i16(self.item_id as i16);
        buf.put_u8(self.count);
        if version < ProtocolVersion::V1_13 {
            // The map id lives in the damage value up to 1.12.2
            buf.put_i16(self.map_id as i16);
        }
        if version < ProtocolVersion::V1_8 {
            buf.put_i16(-1);
        } else if version < ProtocolVersion::V1_13 {
            buf.put_u8(0);
        } else {
            write_compound_tag(buf, &self.map_tag())?;
        }
        Ok(())
    }

    fn write_item<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        buf.put_u8(u8::from(self.count > 0));
        if self.count > 0 {
            write_var_int(buf, self.item_id);
            buf.put_u8(self.count);
            write_structured_payload(buf, &Tag::Compound(self.map_tag()), version)?;
        }
        Ok(())
    }

    fn write_component_item<B: BufMut>(&self, buf: &mut B) {
        write_var_int(buf, i32::from(self.count));
        if self.count > 0 {
            write_var_int(buf, self.item_id);
            write_var_int(buf, 1); // components added
            write_var_int(buf, 0); // components removed
            write_var_int(buf, MAP_ID_COMPONENT);
            write_var_int(buf, self.map_id);
        }
    }
}

impl Packet for SetContainerSlot {
    const KIND: PacketKind = PacketKind::SetContainerSlot;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        buf.put_i8(self.window_id);
        if version >= ProtocolVersion::V1_17_1 {
            write_var_int(buf, self.state_id);
        }
        buf.put_i16(self.slot);

        if version >= ProtocolVersion::V1_20_5 {
            self.write_component_item(buf);
            Ok(())
        } else if version >= ProtocolVersion::V1_13_2 {
            self.write_item(buf, version)
        } else {
            self.write_legacy_item(buf, version)
        }
    }
}

/// Map canvas update
///
/// `data` is row-major, `columns * rows` palette indices.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MapData {
    pub map_id: i32,
    pub columns: u8,
    pub rows: u8,
    pub x: u8,
    pub z: u8,
    pub data: Arc<[u8]>,
}

impl MapData {
    /// Whole 128x128 canvas in one packet
    pub fn full(map_id: i32, data: Arc<[u8]>) -> Self {
        Self {
            map_id,
            columns: MAP_SIZE,
            rows: MAP_SIZE,
            x: 0,
            z: 0,
            data,
        }
    }

    /// Split a 128x128 canvas into the single-column packets 1.7 understands
    pub fn legacy_columns(map_id: i32, canvas: &[u8]) -> Vec<Self> {
        let size = usize::from(MAP_SIZE);
        (0..size)
            .map(|x| {
                let column: Vec<u8> = (0..size)
                    .map(|y| canvas.get(y * size + x).copied().unwrap_or(0))
                    .collect();
                Self {
                    map_id,
                    columns: 1,
                    rows: MAP_SIZE,
                    x: x as u8,
                    z: 0,
                    data: column.into(),
                }
            })
            .collect()
    }

    /// The packets that deliver a full canvas on `version`
    pub fn for_version(map_id: i32, canvas: Arc<[u8]>, version: ProtocolVersion) -> Vec<Self> {
        if version < ProtocolVersion::V1_8 {
            Self::legacy_columns(map_id, &canvas)
        } else {
            vec![Self::full(map_id, canvas)]
        }
    }

    fn check_shape(&self) -> Result<()> {
        if self.data.len() != usize::from(self.columns) * usize::from(self.rows) {
            return Err(ProtocolError::EncodingFailed(constants::ERR_MAP_DATA_SHAPE));
        }
        Ok(())
    }
}

impl Packet for MapData {
    const KIND: PacketKind = PacketKind::MapData;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        self.check_shape()?;
        write_var_int(buf, self.map_id);

        if version < ProtocolVersion::V1_8 {
            if self.columns != 1 {
                return Err(ProtocolError::EncodingFailed(constants::ERR_LEGACY_MAP_COLUMN));
            }
            buf.put_i16(3 + i16::from(self.rows));
            buf.put_u8(0); // colour data
            buf.put_u8(self.x);
            buf.put_u8(self.z);
            buf.put_slice(&self.data);
            return Ok(());
        }

        buf.put_u8(0); // scale
        if version >= ProtocolVersion::V1_9 && version < ProtocolVersion::V1_17 {
            buf.put_u8(0); // tracking position
        }
        if version >= ProtocolVersion::V1_14 {
            buf.put_u8(0); // locked
        }
        if version >= ProtocolVersion::V1_17 {
            buf.put_u8(0); // no icon array
        } else {
            write_var_int(buf, 0);
        }

        buf.put_u8(self.columns);
        if self.columns > 0 {
            buf.put_u8(self.rows);
            buf.put_u8(self.x);
            buf.put_u8(self.z);
            write_var_int(buf, self.data.len() as i32);
            buf.put_slice(&self.data);
        }
        Ok(())
    }
}

/// Ability flags and speeds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PlayerAbilities {
    pub flags: u8,
    pub flying_speed: f32,
    pub field_of_view: f32,
}

impl PlayerAbilities {
    pub const INVULNERABLE: u8 = 0x01;
    pub const FLYING: u8 = 0x02;
    pub const ALLOW_FLYING: u8 = 0x04;
    pub const CREATIVE: u8 = 0x08;
}

impl Packet for PlayerAbilities {
    const KIND: PacketKind = PacketKind::PlayerAbilities;

    fn encode<B: BufMut>(&self, buf: &mut B, _version: ProtocolVersion) -> Result<()> {
        buf.put_u8(self.flags);
        buf.put_f32(self.flying_speed);
        buf.put_f32(self.field_of_view);
        Ok(())
    }
}

/// Forced teleport
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SynchronizePosition {
    pub x: f64,
    /// Feet height. 1.7 receives the eye height instead.
    pub y: f64,
    pub z: f64,
    pub yaw: f32,
    pub pitch: f32,
    /// Relative-coordinate flags (1.8+)
    pub flags: u8,
    /// Confirmation id (1.9+)
    pub teleport_id: i32,
}

impl Packet for SynchronizePosition {
    const KIND: PacketKind = PacketKind::SynchronizePosition;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        buf.put_f64(self.x);
        if version < ProtocolVersion::V1_8 {
            buf.put_f64(self.y + EYE_HEIGHT);
        } else {
            buf.put_f64(self.y);
        }
        buf.put_f64(self.z);
        buf.put_f32(self.yaw);
        buf.put_f32(self.pitch);

        if version < ProtocolVersion::V1_8 {
            buf.put_u8(0); // on ground
            return Ok(());
        }
        buf.put_u8(self.flags);
        if version >= ProtocolVersion::V1_9 {
            write_var_int(buf, self.teleport_id);
        }
        if version.between(ProtocolVersion::V1_17, ProtocolVersion::V1_19_3) {
            buf.put_u8(0); // dismount vehicle
        }
        Ok(())
    }
}

/// Server-originated chat line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemChat {
    pub component: Component,
    /// Show above the hotbar instead of in the chat box
    pub overlay: bool,
}

impl SystemChat {
    pub fn new(component: Component) -> Self {
        Self {
            component,
            overlay: false,
        }
    }

    /// Legacy position byte and 1.19 message type share these values
    fn position(&self) -> u8 {
        if self.overlay {
            2
        } else {
            1
        }
    }
}

impl Packet for SystemChat {
    const KIND: PacketKind = PacketKind::SystemChat;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        self.component.write(buf, version)?;

        if version >= ProtocolVersion::V1_19_1 {
            buf.put_u8(u8::from(self.overlay));
        } else if version >= ProtocolVersion::V1_19 {
            write_var_int(buf, i32::from(self.position()));
        } else if version >= ProtocolVersion::V1_8 {
            buf.put_u8(self.position());
            if version >= ProtocolVersion::V1_16 {
                write_uuid(buf, &Uuid::nil());
            }
        }
        Ok(())
    }
}

/// Experience bar, used as a visible countdown
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SetExperience {
    /// Bar fill in `0.0..=1.0`
    pub bar: f32,
    pub level: i32,
    pub total: i32,
}

impl Packet for SetExperience {
    const KIND: PacketKind = PacketKind::SetExperience;

    fn encode<B: BufMut>(&self, buf: &mut B, version: ProtocolVersion) -> Result<()> {
        buf.put_f32(self.bar);
        if version >= ProtocolVersion::V1_8 {
            write_var_int(buf, self.level);
            write_var_int(buf, self.total);
        } else {
            buf.put_i16(self.level as i16);
            buf.put_i16(self.total as i16);
        }
        Ok(())
    }
}

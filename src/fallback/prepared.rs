//! Packets that are identical for every session.
//!
//! Built once when the gate starts and shared read-only between sessions.

use rand::Rng;

use crate::config::FallbackConfig;
use crate::protocol::component::Component;
use crate::protocol::packets::{
    ClientboundPacket, KeepAlive, PlayerAbilities, SetExperience, SynchronizePosition, SystemChat,
};
use crate::protocol::resource::{ResourceCatalog, ResourceKey};

/// Map the challenge is drawn on
pub const MAP_ID: i32 = 0;

/// Centre of the spawn block
const SPAWN_XZ: f64 = 8.5;

/// Looking down at the held map
const SPAWN_PITCH: f32 = 38.0;

/// Disconnect reasons, colour codes already translated
#[derive(Debug, Clone)]
pub struct DisconnectMessages {
    pub currently_preparing: Component,
    pub too_many_attempts: Component,
    pub took_too_long: Component,
    pub invalid_username: Component,
    pub unexpected_error: Component,
}

#[derive(Debug, Clone)]
pub struct PreparedPackets {
    /// Spawn on top of the platform
    pub position: ClientboundPacket,
    /// Frozen in flight for standard clients
    pub abilities: ClientboundPacket,
    /// Bridged Bedrock clients only accept the flying flag
    pub abilities_alternate: ClientboundPacket,
    pub keep_alive: ClientboundPacket,
    pub enter_code: ClientboundPacket,
    pub incorrect_captcha: ClientboundPacket,
    /// Indexed by whole seconds remaining
    pub xp_countdown: Vec<ClientboundPacket>,
    pub messages: DisconnectMessages,
}

impl PreparedPackets {
    pub fn new(config: &FallbackConfig, catalog: &ResourceCatalog) -> Self {
        let mut rng = rand::rng();
        let messages = &config.messages;

        let position = SynchronizePosition {
            x: SPAWN_XZ,
            y: f64::from(config.captcha.platform_y) + catalog.height(ResourceKey::Barrier),
            z: SPAWN_XZ,
            yaw: 0.0,
            pitch: SPAWN_PITCH,
            flags: 0,
            teleport_id: rng.random_range(1..i32::MAX),
        };

        Self {
            position: position.into(),
            abilities: abilities(PlayerAbilities::FLYING | PlayerAbilities::ALLOW_FLYING),
            abilities_alternate: abilities(PlayerAbilities::FLYING),
            // 1.7 and 1.8 carry the id as a 32-bit value
            keep_alive: KeepAlive {
                id: i64::from(rng.random_range(1..i32::MAX)),
            }
            .into(),
            enter_code: chat(&messages.enter_code),
            incorrect_captcha: chat(&messages.incorrect_captcha),
            xp_countdown: xp_countdown(config.verification.max_duration.as_secs()),
            messages: DisconnectMessages {
                currently_preparing: Component::legacy(&messages.currently_preparing),
                too_many_attempts: Component::legacy(&messages.too_many_attempts),
                took_too_long: Component::legacy(&messages.took_too_long),
                invalid_username: Component::legacy(&messages.invalid_username),
                unexpected_error: Component::legacy(&messages.unexpected_error),
            },
        }
    }
}

fn abilities(flags: u8) -> ClientboundPacket {
    PlayerAbilities {
        flags,
        flying_speed: 0.0,
        field_of_view: 0.0,
    }
    .into()
}

fn chat(text: &str) -> ClientboundPacket {
    SystemChat::new(Component::legacy(text)).into()
}

/// One entry per whole second from 0 to `seconds`, the bar draining with the level
fn xp_countdown(seconds: u64) -> Vec<ClientboundPacket> {
    let last = seconds.max(1) as f32;
    (0..=seconds)
        .map(|i| {
            SetExperience {
                bar: if seconds == 0 { 0.0 } else { i as f32 / last },
                level: i as i32,
                total: 0,
            }
            .into()
        })
        .collect()
}

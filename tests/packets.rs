//! Integration tests for packet layouts across revisions
//!
//! Inbound frames go through the dispatcher exactly as a session would feed
//! them; outbound packets are checked byte for byte after the packet id.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::sync::Arc;

use bytes::{Buf, BufMut, Bytes, BytesMut};
use fallback_gate::core::codec::{read_var_int, write_string, write_uuid, write_var_int};
use fallback_gate::error::{Malformed, ProtocolError};
use fallback_gate::protocol::component::Component;
use fallback_gate::protocol::dispatcher::{Dispatcher, Inbound};
use fallback_gate::protocol::packets::{
    encode_packet, ChatMessage, ClientboundPacket, KeepAlive, KeepAliveResponse, LoginStart,
    MapData, Packet, PlayerAbilities, ServerboundPacket, SetContainerSlot, SetExperience,
    SetPlayerPosition, SynchronizePosition, SystemChat,
};
use fallback_gate::protocol::registry::{packet_registry, ConnectionState, PacketKind};
use fallback_gate::protocol::version::ProtocolVersion;
use uuid::Uuid;
use ProtocolVersion::*;

fn dispatcher() -> Dispatcher {
    Dispatcher::new(packet_registry().unwrap())
}

fn frame(kind: PacketKind, version: ProtocolVersion, body: impl FnOnce(&mut BytesMut)) -> Bytes {
    let mut buf = BytesMut::new();
    write_var_int(&mut buf, packet_registry().unwrap().id(kind, version));
    body(&mut buf);
    buf.freeze()
}

fn play(version: ProtocolVersion, frame: Bytes) -> ServerboundPacket {
    match dispatcher().dispatch(version, ConnectionState::Play, frame).unwrap() {
        Inbound::Packet(packet) => packet,
        other => panic!("expected a packet, got {other:?}"),
    }
}

/// Encode and strip the packet id, checking it against the registry
fn body(packet: impl Into<ClientboundPacket>, version: ProtocolVersion) -> Bytes {
    let packet = packet.into();
    let mut bytes = encode_packet(&packet, version).unwrap().freeze();
    let id = read_var_int(&mut bytes).unwrap();
    assert_eq!(id, packet_registry().unwrap().id(packet.kind(), version));
    bytes
}

#[test]
fn test_login_start_per_revision() {
    let uuid = Uuid::from_u128(7);

    let legacy = frame(PacketKind::LoginStart, V1_12_2, |b| write_string(b, "Steve"));
    let packet = dispatcher()
        .dispatch(V1_12_2, ConnectionState::Login, legacy)
        .unwrap();
    assert_eq!(
        packet,
        Inbound::Packet(ServerboundPacket::LoginStart(LoginStart {
            username: "Steve".into(),
            uuid: None,
        }))
    );

    let modern = frame(PacketKind::LoginStart, V1_20_2, |b| {
        write_string(b, "Steve");
        write_uuid(b, &uuid);
    });
    let Inbound::Packet(ServerboundPacket::LoginStart(login)) = dispatcher()
        .dispatch(V1_20_2, ConnectionState::Login, modern)
        .unwrap()
    else {
        panic!("expected login start");
    };
    assert_eq!(login.uuid, Some(uuid));

    // 1.19.1 marks the UUID as optional
    let optional = frame(PacketKind::LoginStart, V1_19_1, |b| {
        write_string(b, "Steve");
        b.put_u8(0); // no key
        b.put_u8(0); // no uuid
    });
    assert!(dispatcher()
        .dispatch(V1_19_1, ConnectionState::Login, optional)
        .is_ok());
}

#[test]
fn test_login_start_rejects_long_username() {
    let long = frame(PacketKind::LoginStart, V1_8, |b| write_string(b, "abcdefghijklmnopq"));
    assert!(matches!(
        dispatcher().dispatch(V1_8, ConnectionState::Login, long),
        Err(ProtocolError::Malformed(Malformed::StringTooLong))
    ));
}

#[test]
fn test_legacy_chat_cap() {
    let text = "x".repeat(101);
    let long = frame(PacketKind::ChatMessage, V1_10, |b| write_string(b, &text));
    assert!(dispatcher()
        .dispatch(V1_10, ConnectionState::Play, long)
        .is_err());

    let ok = frame(PacketKind::ChatMessage, V1_11, |b| write_string(b, &text));
    assert_eq!(
        play(V1_11, ok),
        ServerboundPacket::ChatMessage(ChatMessage { message: text })
    );
}

#[test]
fn test_signed_chat_1_19_3() {
    let chat = frame(PacketKind::ChatMessage, V1_19_3, |b| {
        write_string(b, "abcde");
        b.put_i64(1_700_000_000_000); // timestamp
        b.put_i64(42); // salt
        b.put_u8(1);
        b.put_slice(&[0xAB; 256]);
        write_var_int(b, 0); // message count
        b.put_slice(&[0, 0, 0]); // acknowledged
    });
    assert_eq!(
        play(V1_19_3, chat),
        ServerboundPacket::ChatMessage(ChatMessage {
            message: "abcde".into()
        })
    );
}

#[test]
fn test_signed_chat_1_19_1_last_seen() {
    let chat = frame(PacketKind::ChatMessage, V1_19_1, |b| {
        write_string(b, "abcde");
        b.put_i64(0);
        b.put_i64(0);
        write_var_int(b, 0); // empty signature
        b.put_u8(0); // signed preview
        write_var_int(b, 1);
        write_uuid(b, &Uuid::from_u128(1));
        write_var_int(b, 2);
        b.put_slice(&[1, 2]);
        b.put_u8(0); // no last received
    });
    assert!(matches!(play(V1_19_1, chat), ServerboundPacket::ChatMessage(_)));

    let too_many = frame(PacketKind::ChatMessage, V1_19_1, |b| {
        write_string(b, "abcde");
        b.put_i64(0);
        b.put_i64(0);
        write_var_int(b, 0);
        b.put_u8(0);
        write_var_int(b, 6);
    });
    assert!(matches!(
        dispatcher().dispatch(V1_19_1, ConnectionState::Play, too_many),
        Err(ProtocolError::Malformed(Malformed::LengthTooLarge))
    ));
}

#[test]
fn test_position_skips_legacy_stance() {
    let position = frame(PacketKind::SetPlayerPosition, V1_7_6, |b| {
        b.put_f64(1.0);
        b.put_f64(64.0);
        b.put_f64(65.62); // stance
        b.put_f64(3.0);
        b.put_u8(1);
    });
    assert_eq!(
        play(V1_7_6, position),
        ServerboundPacket::SetPlayerPosition(SetPlayerPosition {
            x: 1.0,
            y: 64.0,
            z: 3.0,
            on_ground: true,
        })
    );
}

#[test]
fn test_keep_alive_response_widths() {
    let legacy = frame(PacketKind::KeepAliveResponse, V1_7_2, |b| b.put_i32(-5));
    let varint = frame(PacketKind::KeepAliveResponse, V1_12_1, |b| write_var_int(b, 300));
    let long = frame(PacketKind::KeepAliveResponse, V1_12_2, |b| b.put_i64(i64::MAX));

    assert_eq!(
        play(V1_7_2, legacy),
        ServerboundPacket::KeepAliveResponse(KeepAliveResponse { id: -5 })
    );
    assert_eq!(
        play(V1_12_1, varint),
        ServerboundPacket::KeepAliveResponse(KeepAliveResponse { id: 300 })
    );
    assert_eq!(
        play(V1_12_2, long),
        ServerboundPacket::KeepAliveResponse(KeepAliveResponse { id: i64::MAX })
    );
}

#[test]
fn test_truncated_body_is_malformed() {
    let short = frame(PacketKind::SetPlayerPosition, V1_16_4, |b| b.put_f64(1.0));
    let err = dispatcher()
        .dispatch(V1_16_4, ConnectionState::Play, short)
        .unwrap_err();
    assert!(err.is_malformed());
}

#[test]
fn test_wrong_direction() {
    let mut buf = BytesMut::new();
    assert!(matches!(
        ChatMessage {
            message: "x".into()
        }
        .encode(&mut buf, V1_8),
        Err(ProtocolError::Malformed(Malformed::UnsupportedDirection))
    ));
    assert!(matches!(
        KeepAlive::decode(&mut Bytes::from_static(&[0; 8]), V1_8),
        Err(ProtocolError::Malformed(Malformed::UnsupportedDirection))
    ));
}

#[test]
fn test_keep_alive_widths() {
    assert_eq!(&body(KeepAlive { id: 9 }, V1_7_2)[..], &[0, 0, 0, 9]);
    assert_eq!(&body(KeepAlive { id: 300 }, V1_8)[..], &[0xAC, 0x02]);
    assert_eq!(body(KeepAlive { id: 9 }, V1_12_2).len(), 8);
}

#[test]
fn test_container_slot_legacy_layout() {
    let slot = SetContainerSlot {
        window_id: 0,
        state_id: 0,
        slot: 40,
        count: 1,
        item_id: 358,
        map_id: 0,
    };
    // window, slot, item id, count, damage (map id), empty tag
    assert_eq!(
        &body(slot, V1_8)[..],
        &[0x00, 0x00, 0x28, 0x01, 0x66, 0x01, 0x00, 0x00, 0x00]
    );
    // 1.7 marks the missing tag with a -1 length
    assert_eq!(
        &body(slot, V1_7_2)[..],
        &[0x00, 0x00, 0x28, 0x01, 0x66, 0x01, 0x00, 0x00, 0xFF, 0xFF]
    );
}

#[test]
fn test_container_slot_component_layout() {
    let slot = SetContainerSlot {
        window_id: 0,
        state_id: 3,
        slot: 36,
        count: 1,
        item_id: 982,
        map_id: 0,
    };
    let mut expected = BytesMut::new();
    expected.put_i8(0);
    write_var_int(&mut expected, 3);
    expected.put_i16(36);
    write_var_int(&mut expected, 1);
    write_var_int(&mut expected, 982);
    write_var_int(&mut expected, 1);
    write_var_int(&mut expected, 0);
    write_var_int(&mut expected, 26);
    write_var_int(&mut expected, 0);
    assert_eq!(&body(slot, V1_21)[..], &expected[..]);
}

#[test]
fn test_container_slot_tag_layout() {
    let slot = SetContainerSlot {
        window_id: 0,
        state_id: 0,
        slot: 40,
        count: 1,
        item_id: 847,
        map_id: 0,
    };
    let mut bytes = body(slot, V1_16_4);
    bytes.advance(3); // window and slot
    assert_eq!(bytes.get_u8(), 1); // present
    assert_eq!(read_var_int(&mut bytes).unwrap(), 847);
    assert_eq!(bytes.get_u8(), 1);
    assert_eq!(bytes.get_u8(), 10); // compound
}

#[test]
fn test_map_data_layouts() {
    let canvas: Arc<[u8]> = vec![4u8; 128 * 128].into();

    let legacy = MapData::for_version(0, canvas.clone(), V1_7_2);
    assert_eq!(legacy.len(), 128);
    let column = body(legacy[5].clone(), V1_7_2);
    // map id, length, type, x, z, colours
    assert_eq!(&column[..6], &[0x00, 0x00, 131, 0x00, 0x05, 0x00]);
    assert_eq!(column.len(), 6 + 128);

    let full = MapData::for_version(0, canvas.clone(), V1_8);
    assert_eq!(full.len(), 1);
    let mut bytes = body(full[0].clone(), V1_8);
    // map id, scale, icon count, then the patch header
    assert_eq!(&bytes[..6], &[0x00, 0x00, 0x00, 128, 128, 0x00]);
    bytes.advance(7);
    assert_eq!(read_var_int(&mut bytes).unwrap(), 128 * 128);
    assert_eq!(bytes.remaining(), 128 * 128);

    // tracking byte, locked byte and icon flag
    let modern = body(MapData::full(0, canvas.clone()), V1_14);
    assert_eq!(&modern[..5], &[0x00, 0x00, 0x00, 0x00, 0x00]);
    assert_eq!(modern[5], 128);
}

#[test]
fn test_map_data_rejects_bad_shape() {
    let map = MapData::full(0, vec![0u8; 10].into());
    assert!(matches!(
        encode_packet(&map.into(), V1_16),
        Err(ProtocolError::EncodingFailed(_))
    ));

    let full = MapData::full(0, vec![0u8; 128 * 128].into());
    assert!(encode_packet(&full.into(), V1_7_2).is_err());
}

#[test]
fn test_synchronize_position_layouts() {
    let position = SynchronizePosition {
        x: 8.5,
        y: 256.0,
        z: 8.5,
        yaw: 0.0,
        pitch: 38.0,
        flags: 0,
        teleport_id: 1,
    };

    let mut legacy = body(position, V1_7_2);
    legacy.advance(8);
    assert!((legacy.get_f64() - 257.62).abs() < 1e-9);
    assert_eq!(legacy.len(), 8 + 4 + 4 + 1);

    assert_eq!(body(position, V1_8).len(), 8 * 3 + 4 * 2 + 1);
    assert_eq!(body(position, V1_9).len(), 8 * 3 + 4 * 2 + 1 + 1);
    assert_eq!(body(position, V1_17).len(), 8 * 3 + 4 * 2 + 1 + 1 + 1);
    assert_eq!(body(position, V1_19_4).len(), 8 * 3 + 4 * 2 + 1 + 1);
}

#[test]
fn test_abilities_layout() {
    let abilities = PlayerAbilities {
        flags: PlayerAbilities::FLYING | PlayerAbilities::ALLOW_FLYING,
        flying_speed: 0.0,
        field_of_view: 0.0,
    };
    assert_eq!(&body(abilities, V1_20_5)[..], &[0x06, 0, 0, 0, 0, 0, 0, 0, 0]);
}

#[test]
fn test_system_chat_trailers() {
    let chat = SystemChat::new(Component::text("hi"));
    let json = r#"{"text":"hi"}"#;

    let legacy = body(chat.clone(), V1_7_2);
    assert_eq!(legacy.len(), 1 + json.len());

    let positioned = body(chat.clone(), V1_12_2);
    assert_eq!(positioned.len(), 1 + json.len() + 1);
    assert_eq!(positioned[positioned.len() - 1], 1);

    let with_sender = body(chat.clone(), V1_16);
    assert_eq!(with_sender.len(), 1 + json.len() + 1 + 16);

    let typed = body(chat.clone(), V1_19);
    assert_eq!(typed[typed.len() - 1], 1);

    let overlay = SystemChat {
        overlay: true,
        ..chat.clone()
    };
    let flagged = body(overlay, V1_19_1);
    assert_eq!(flagged[flagged.len() - 1], 1);

    // Tag component from 1.20.3
    let tagged = body(chat, V1_20_3);
    assert_eq!(tagged[0], 10);
    assert_eq!(tagged[tagged.len() - 1], 0);
}

#[test]
fn test_experience_layouts() {
    let xp = SetExperience {
        bar: 0.5,
        level: 30,
        total: 0,
    };
    assert_eq!(&body(xp, V1_7_2)[..], &[0x3F, 0x00, 0x00, 0x00, 0x00, 0x1E, 0x00, 0x00]);
    assert_eq!(&body(xp, V1_8)[..], &[0x3F, 0x00, 0x00, 0x00, 0x1E, 0x00]);
}

#[test]
fn test_every_clientbound_packet_encodes_everywhere() {
    let canvas: Arc<[u8]> = vec![0u8; 128 * 128].into();
    for &version in ProtocolVersion::ALL {
        let mut packets: Vec<ClientboundPacket> = vec![
            KeepAlive { id: 1 }.into(),
            SetContainerSlot {
                window_id: 0,
                state_id: 0,
                slot: 40,
                count: 1,
                item_id: 358,
                map_id: 0,
            }
            .into(),
            PlayerAbilities {
                flags: 0x02,
                flying_speed: 0.0,
                field_of_view: 0.0,
            }
            .into(),
            SynchronizePosition {
                x: 0.0,
                y: 0.0,
                z: 0.0,
                yaw: 0.0,
                pitch: 0.0,
                flags: 0,
                teleport_id: 1,
            }
            .into(),
            SystemChat::new(Component::legacy("&ahello")).into(),
            SetExperience {
                bar: 1.0,
                level: 1,
                total: 0,
            }
            .into(),
        ];
        packets.extend(
            MapData::for_version(0, canvas.clone(), version)
                .into_iter()
                .map(ClientboundPacket::from),
        );
        for packet in &packets {
            assert!(
                encode_packet(packet, version).is_ok(),
                "{:?} on {version}",
                packet.kind()
            );
        }
    }
}

//! Integration tests for the verification session state machine
//!
//! Challenges are rendered from a one-letter alphabet so every answer is known.

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::time::Duration;

use bytes::{BufMut, Bytes, BytesMut};
use fallback_gate::config::{FallbackConfig, Gamemode};
use fallback_gate::core::codec::{read_var_int, write_string, write_var_int};
use fallback_gate::fallback::{
    FailReason, FallbackConnection, FallbackGate, QueuedConnection, SessionState,
    VerificationSession,
};
use fallback_gate::protocol::component::Component;
use fallback_gate::protocol::packets::{
    ChatMessage, ClientboundPacket, KeepAliveResponse, ServerboundPacket, SetPlayerPosition,
};
use fallback_gate::protocol::resource::{resource_catalog, ResourceKey};
use fallback_gate::protocol::version::ProtocolVersion;
use tokio_util::codec::Decoder;

const ANSWER: &str = "aaa";

fn config() -> FallbackConfig {
    FallbackConfig::default_with_overrides(|c| {
        c.captcha.alphabet = "a".to_string();
        c.captcha.length = 3;
        c.captcha.precompute = 8;
        c.captcha.refill_threshold = 1;
    })
}

fn gate_with(config: FallbackConfig) -> FallbackGate {
    let gate = FallbackGate::new(config).expect("gate should build");
    gate.pool().fill(4);
    gate
}

fn started(gate: &FallbackGate, conn: &mut QueuedConnection) -> VerificationSession {
    let mut session = gate.session();
    assert_eq!(session.start(conn, "Steve"), SessionState::CaptchaPresented);
    conn.take_sent();
    session
}

fn chat(message: &str) -> ServerboundPacket {
    ServerboundPacket::ChatMessage(ChatMessage {
        message: message.to_string(),
    })
}

fn movement() -> ServerboundPacket {
    ServerboundPacket::SetPlayerPosition(SetPlayerPosition {
        x: 8.5,
        y: 256.0,
        z: 8.5,
        on_ground: false,
    })
}

fn count<F: Fn(&ClientboundPacket) -> bool>(conn: &QueuedConnection, f: F) -> usize {
    conn.sent().iter().filter(|p| f(p)).count()
}

fn legacy(text: &str) -> Component {
    Component::legacy(text)
}

#[tokio::test(start_paused = true)]
async fn test_setup_packets_sent_in_one_flush() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_20_3);
    let mut session = gate.session();

    assert_eq!(session.start(&mut conn, "Steve"), SessionState::CaptchaPresented);
    assert_eq!(conn.flush_count(), 1);
    assert!(conn.pending().is_empty());

    let sent = conn.sent();
    assert!(matches!(&sent[0], ClientboundPacket::SetContainerSlot(slot) if slot.slot == 40));
    assert!(matches!(&sent[1], ClientboundPacket::MapData(map) if map.columns == 128));
    assert!(matches!(sent[2], ClientboundPacket::SynchronizePosition(_)));
    assert!(matches!(&sent[3], ClientboundPacket::PlayerAbilities(a) if a.flags == 0x06));
    assert!(matches!(sent[4], ClientboundPacket::SystemChat(_)));
    assert_eq!(sent.len(), 5);
    assert_eq!(session.stage(), Some("captcha"));
    assert_eq!(session.username(), Some("Steve"));
}

#[tokio::test(start_paused = true)]
async fn test_latest_standard_client_setup() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::LATEST);
    assert_eq!(ProtocolVersion::LATEST, ProtocolVersion::V1_21);
    let mut session = gate.session();

    assert_eq!(session.start(&mut conn, "Steve"), SessionState::CaptchaPresented);
    let map_item = resource_catalog()
        .unwrap()
        .resolve(ResourceKey::FilledMap, ProtocolVersion::LATEST);
    assert_eq!(map_item, 982);
    assert!(matches!(
        &conn.sent()[0],
        ClientboundPacket::SetContainerSlot(slot) if slot.slot == 40 && slot.item_id == map_item
    ));

    let mut codec = gate.frame_codec();
    let mut wire = BytesMut::new();
    assert_eq!(conn.encode_sent(&mut codec, &mut wire).unwrap(), 5);
    let mut ids = Vec::new();
    while let Some(mut frame) = codec.decode(&mut wire).unwrap() {
        ids.push(read_var_int(&mut frame).unwrap());
    }
    assert_eq!(ids, vec![0x15, 0x2C, 0x40, 0x38, 0x6C]);
}

#[tokio::test(start_paused = true)]
async fn test_legacy_alternate_client_setup() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_7_2).alternate();
    let mut session = gate.session();

    session.start(&mut conn, "Steve");
    assert!(matches!(&conn.sent()[0], ClientboundPacket::SetContainerSlot(slot) if slot.slot == 36));
    assert_eq!(
        count(&conn, |p| matches!(p, ClientboundPacket::MapData(m) if m.columns == 1)),
        128
    );
    assert_eq!(
        count(&conn, |p| matches!(p, ClientboundPacket::PlayerAbilities(a) if a.flags == 0x02)),
        1
    );
}

#[tokio::test(start_paused = true)]
async fn test_correct_answer_passes_case_insensitively() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    assert_eq!(session.handle(&mut conn, chat("AaA")), SessionState::Passed);
    assert!(!conn.is_closed());
    assert!(conn.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_attempt_budget() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    assert_eq!(session.handle(&mut conn, chat("nope")), SessionState::CaptchaPresented);
    assert_eq!(session.handle(&mut conn, chat("nope")), SessionState::CaptchaPresented);
    assert_eq!(count(&conn, |p| matches!(p, ClientboundPacket::SystemChat(_))), 2);

    assert_eq!(
        session.handle(&mut conn, chat("nope")),
        SessionState::Failed(FailReason::TooManyAttempts)
    );
    assert_eq!(
        conn.disconnect_reason(),
        Some(&legacy(&gate.config().messages.too_many_attempts))
    );
}

#[tokio::test(start_paused = true)]
async fn test_single_try_fails_on_first_wrong_answer() {
    let gate = gate_with(FallbackConfig {
        verification: fallback_gate::config::VerificationConfig {
            max_tries: 1,
            ..Default::default()
        },
        ..config()
    });
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_12_2);
    let mut session = started(&gate, &mut conn);

    assert_eq!(
        session.handle(&mut conn, chat("wrong")),
        SessionState::Failed(FailReason::TooManyAttempts)
    );
}

#[tokio::test(start_paused = true)]
async fn test_timeout_beats_correct_answer() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    tokio::time::advance(Duration::from_secs(46)).await;
    assert_eq!(session.handle(&mut conn, chat(ANSWER)), SessionState::TimedOut);
    assert_eq!(
        conn.disconnect_reason(),
        Some(&legacy(&gate.config().messages.took_too_long))
    );
}

#[tokio::test(start_paused = true)]
async fn test_answer_at_deadline_still_counts() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    tokio::time::advance(Duration::from_secs(45)).await;
    assert_eq!(session.handle(&mut conn, chat(ANSWER)), SessionState::Passed);
}

#[tokio::test(start_paused = true)]
async fn test_ignored_packet_still_times_out() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    // 0x0A is an animation packet on 1.8, which the gate does not inspect
    let frame = Bytes::from_static(&[0x0A]);
    assert_eq!(session.receive(&mut conn, frame.clone()), SessionState::CaptchaPresented);

    tokio::time::advance(Duration::from_secs(50)).await;
    assert_eq!(session.receive(&mut conn, frame), SessionState::TimedOut);
}

#[tokio::test(start_paused = true)]
async fn test_countdown_once_per_second() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    session.handle(&mut conn, movement());
    session.handle(&mut conn, movement());
    session.handle(&mut conn, movement());
    assert_eq!(conn.take_sent().len(), 1);

    tokio::time::advance(Duration::from_millis(1000)).await;
    session.handle(&mut conn, movement());
    session.handle(&mut conn, movement());

    let sent = conn.take_sent();
    assert_eq!(sent.len(), 1);
    assert!(matches!(&sent[0], ClientboundPacket::SetExperience(xp) if xp.level == 44));
}

#[tokio::test(start_paused = true)]
async fn test_no_countdown_in_creative() {
    let gate = gate_with(FallbackConfig::default_with_overrides(|c| {
        *c = config();
        c.verification.gamemode = Gamemode::Creative;
    }));
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_16_4);
    let mut session = started(&gate, &mut conn);

    for _ in 0..5 {
        session.handle(&mut conn, movement());
        tokio::time::advance(Duration::from_secs(1)).await;
    }
    assert_eq!(count(&conn, |p| matches!(p, ClientboundPacket::SetExperience(_))), 0);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_every_twenty_one_movements() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_19_4);
    let mut session = started(&gate, &mut conn);
    let keep_alives = |conn: &QueuedConnection| {
        count(conn, |p| matches!(p, ClientboundPacket::KeepAlive(_)))
    };

    for _ in 0..20 {
        session.handle(&mut conn, movement());
    }
    assert_eq!(keep_alives(&conn), 0);

    session.handle(&mut conn, movement());
    assert_eq!(keep_alives(&conn), 1);

    for _ in 0..21 {
        session.handle(&mut conn, movement());
    }
    assert_eq!(keep_alives(&conn), 2);
}

#[tokio::test(start_paused = true)]
async fn test_keep_alive_responses_are_not_movements() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_19_4);
    let mut session = started(&gate, &mut conn);

    for _ in 0..30 {
        session.handle(
            &mut conn,
            ServerboundPacket::KeepAliveResponse(KeepAliveResponse { id: 1 }),
        );
    }
    assert!(conn.sent().is_empty());
}

#[tokio::test(start_paused = true)]
async fn test_empty_pool_disconnects_before_setup() {
    let gate = FallbackGate::new(config()).unwrap();
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_21);
    let mut session = gate.session();

    assert_eq!(
        session.start(&mut conn, "Steve"),
        SessionState::Failed(FailReason::CaptchaUnavailable)
    );
    assert!(conn.sent().is_empty());
    assert_eq!(
        conn.disconnect_reason(),
        Some(&legacy(&gate.config().messages.currently_preparing))
    );
}

#[tokio::test(start_paused = true)]
async fn test_each_session_takes_its_own_challenge() {
    let gate = FallbackGate::new(config()).unwrap();
    gate.pool().fill(2);

    for _ in 0..2 {
        let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
        started(&gate, &mut conn);
    }
    assert!(gate.pool().is_empty());

    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = gate.session();
    assert_eq!(
        session.start(&mut conn, "Alex"),
        SessionState::Failed(FailReason::CaptchaUnavailable)
    );
}

#[tokio::test(start_paused = true)]
async fn test_login_frame_triggers_challenge() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = gate.session();

    let mut frame = BytesMut::new();
    write_var_int(&mut frame, 0x00);
    write_string(&mut frame, "Steve");

    assert_eq!(
        session.receive(&mut conn, frame.freeze()),
        SessionState::CaptchaPresented
    );
    assert_eq!(session.username(), Some("Steve"));
}

#[tokio::test(start_paused = true)]
async fn test_chat_frame_passes() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    let mut frame = BytesMut::new();
    write_var_int(&mut frame, 0x01);
    write_string(&mut frame, ANSWER);

    assert_eq!(session.receive(&mut conn, frame.freeze()), SessionState::Passed);
}

#[tokio::test(start_paused = true)]
async fn test_invalid_username_rejected() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = gate.session();

    assert_eq!(
        session.start(&mut conn, "bad name!"),
        SessionState::Failed(FailReason::InvalidUsername)
    );
    assert_eq!(
        conn.disconnect_reason(),
        Some(&legacy(&gate.config().messages.invalid_username))
    );
    assert_eq!(gate.pool().len(), 4);
}

#[tokio::test(start_paused = true)]
async fn test_username_check_can_be_disabled() {
    let gate = gate_with(FallbackConfig::default_with_overrides(|c| {
        *c = config();
        c.verification.validate_usernames = false;
    }));
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = gate.session();

    assert_eq!(
        session.start(&mut conn, "bad name!"),
        SessionState::CaptchaPresented
    );
}

#[tokio::test(start_paused = true)]
async fn test_malformed_frame_fails_session() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    let frame = Bytes::from_static(&[0xFF, 0xFF, 0xFF, 0xFF, 0xFF]);
    assert_eq!(
        session.receive(&mut conn, frame),
        SessionState::Failed(FailReason::MalformedPacket)
    );
    assert!(conn.is_closed());
}

#[tokio::test(start_paused = true)]
async fn test_trailing_bytes_fail_session() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    let mut frame = BytesMut::new();
    write_var_int(&mut frame, 0x01);
    write_string(&mut frame, ANSWER);
    frame.put_u8(0);

    assert_eq!(
        session.receive(&mut conn, frame.freeze()),
        SessionState::Failed(FailReason::MalformedPacket)
    );
}

#[tokio::test(start_paused = true)]
async fn test_unknown_login_packet_is_malformed() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = gate.session();

    assert_eq!(
        session.receive(&mut conn, Bytes::from_static(&[0x05])),
        SessionState::Failed(FailReason::MalformedPacket)
    );
}

#[tokio::test(start_paused = true)]
async fn test_terminal_state_ignores_packets() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    assert_eq!(session.handle(&mut conn, chat(ANSWER)), SessionState::Passed);
    assert_eq!(session.handle(&mut conn, chat("again")), SessionState::Passed);
    assert_eq!(session.handle(&mut conn, movement()), SessionState::Passed);
    assert_eq!(session.start(&mut conn, "Steve"), SessionState::Passed);
    assert!(conn.sent().is_empty());
    assert_eq!(session.close(), SessionState::Passed);
}

#[tokio::test(start_paused = true)]
async fn test_close_marks_disconnected() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    assert_eq!(session.close(), SessionState::Disconnected);
    assert_eq!(session.stage(), None);
    assert_eq!(session.handle(&mut conn, chat(ANSWER)), SessionState::Disconnected);
}

#[tokio::test(start_paused = true)]
async fn test_writes_to_closed_connection_end_session() {
    let gate = gate_with(config());
    let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
    let mut session = started(&gate, &mut conn);

    conn.disconnect(&Component::text("proxy shutting down")).unwrap();
    assert_eq!(session.handle(&mut conn, chat("wrong")), SessionState::Disconnected);
}

//! Concurrency tests for the challenge pool and shared gate state

#![allow(clippy::expect_used, clippy::unwrap_used)]

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use fallback_gate::captcha::{CaptchaGenerator, CaptchaPool};
use fallback_gate::config::FallbackConfig;
use fallback_gate::error::ProtocolError;
use fallback_gate::fallback::{FallbackGate, QueuedConnection, SessionState};
use fallback_gate::protocol::version::ProtocolVersion;
use tokio::task::JoinSet;

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn concurrent_takes_never_share_a_challenge() {
    let pool = CaptchaPool::new(CaptchaGenerator::new("abcdefghjk", 6).unwrap(), 200, 0);
    assert_eq!(pool.fill(200), 200);

    let mut tasks = JoinSet::new();
    for _ in 0..16 {
        let pool = pool.clone();
        tasks.spawn(async move {
            let mut taken = Vec::new();
            loop {
                match pool.take_random() {
                    Ok(challenge) => taken.push(challenge.pixels().clone()),
                    Err(ProtocolError::PoolExhausted) => return taken,
                    Err(e) => panic!("unexpected error: {e}"),
                }
                tokio::task::yield_now().await;
            }
        });
    }

    let mut seen = HashSet::new();
    let mut total = 0;
    while let Some(res) = tasks.join_next().await {
        for pixels in res.unwrap() {
            total += 1;
            assert!(seen.insert(Arc::as_ptr(&pixels) as *const u8 as usize));
        }
    }
    assert_eq!(total, 200);
    assert!(pool.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn refill_keeps_up_with_takes() {
    let pool = CaptchaPool::new(CaptchaGenerator::new("abc", 4).unwrap(), 40, 20);
    let refill = pool.spawn_refill(&tokio::runtime::Handle::current()).unwrap();

    let mut taken = 0;
    for _ in 0..2000 {
        if pool.take_random().is_ok() {
            taken += 1;
        }
        if taken == 100 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
    assert_eq!(taken, 100);
    refill.abort();
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn sessions_share_one_gate() {
    let config = FallbackConfig::default_with_overrides(|c| {
        c.captcha.alphabet = "z".to_string();
        c.captcha.length = 2;
        c.captcha.precompute = 64;
        c.captcha.refill_threshold = 0;
    });
    let gate = FallbackGate::new(config).unwrap();
    gate.pool().fill(64);

    let mut tasks = JoinSet::new();
    for i in 0..64 {
        let gate = gate.clone();
        tasks.spawn(async move {
            let version = ProtocolVersion::ALL[i % ProtocolVersion::ALL.len()];
            let mut conn = QueuedConnection::new(version);
            let mut session = gate.session();
            session.start(&mut conn, &format!("player_{i}"));
            session.handle(
                &mut conn,
                fallback_gate::protocol::packets::ServerboundPacket::ChatMessage(
                    fallback_gate::protocol::packets::ChatMessage {
                        message: "zz".to_string(),
                    },
                ),
            )
        });
    }

    while let Some(res) = tasks.join_next().await {
        assert_eq!(res.unwrap(), SessionState::Passed);
    }
    assert!(gate.pool().is_empty());
}

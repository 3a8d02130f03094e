//! Map CAPTCHA stage.
//!
//! On entry the client is handed a filled map showing the challenge, frozen in
//! the air above the platform and asked to type the code in chat. While it waits
//! the experience bar counts down the remaining seconds and a keep-alive goes out
//! every few movement packets so the client does not time out on its own.

use tokio::time::Instant;
use tracing::debug;

use crate::captcha::CaptchaChallenge;
use crate::error::{ProtocolError, Result};
use crate::fallback::connection::FallbackConnection;
use crate::fallback::prepared::MAP_ID;
use crate::fallback::session::{FailReason, SessionState, StageOutcome, VerificationStage};
use crate::fallback::GateContext;
use crate::protocol::dispatcher::Inbound;
use crate::protocol::packets::{MapData, ServerboundPacket, SetContainerSlot};
use crate::protocol::resource::ResourceKey;

/// Movement packets between keep-alives
pub const KEEP_ALIVE_INTERVAL: u32 = 20;

/// Off-hand slot
const OFFHAND_SLOT: i16 = 40;
/// First hotbar slot, used where the off-hand is not available
const HOTBAR_SLOT: i16 = 36;

#[derive(Debug)]
pub struct CaptchaStage {
    challenge: Option<CaptchaChallenge>,
    tries: u32,
    entered_at: Instant,
    last_countdown: Option<u64>,
    movements: u32,
}

impl Default for CaptchaStage {
    fn default() -> Self {
        Self::new()
    }
}

impl CaptchaStage {
    pub fn new() -> Self {
        Self {
            challenge: None,
            tries: 0,
            entered_at: Instant::now(),
            last_countdown: None,
            movements: 0,
        }
    }

    /// Attempts left before the session fails
    pub fn tries_left(&self) -> u32 {
        self.tries
    }

    fn check_answer(&mut self, ctx: &GateContext, conn: &mut dyn FallbackConnection, message: &str) -> Result<StageOutcome> {
        let correct = self
            .challenge
            .as_ref()
            .is_some_and(|c| message.to_lowercase() == c.answer());
        if correct {
            return Ok(StageOutcome::Passed);
        }

        self.tries = self.tries.saturating_sub(1);
        debug!(tries_left = self.tries, "Wrong CAPTCHA answer");
        if self.tries < 1 {
            return Ok(StageOutcome::Failed(FailReason::TooManyAttempts));
        }
        conn.write(&ctx.prepared.incorrect_captcha)?;
        Ok(StageOutcome::Continue)
    }

    fn on_movement(&mut self, ctx: &GateContext, conn: &mut dyn FallbackConnection) -> Result<()> {
        if ctx.config.verification.gamemode.is_survival_or_adventure() {
            let max = ctx.config.verification.max_duration;
            let remaining = max.saturating_sub(self.entered_at.elapsed());
            let index = remaining.as_millis() as u64 / 1000;
            if self.last_countdown != Some(index) {
                if let Some(xp) = ctx.prepared.xp_countdown.get(index as usize) {
                    conn.write(xp)?;
                }
            }
            self.last_countdown = Some(index);
        }

        self.movements += 1;
        if self.movements > KEEP_ALIVE_INTERVAL {
            self.movements = 0;
            conn.write(&ctx.prepared.keep_alive)?;
        }
        Ok(())
    }
}

impl VerificationStage for CaptchaStage {
    fn name(&self) -> &'static str {
        "captcha"
    }

    fn state(&self) -> SessionState {
        SessionState::CaptchaPresented
    }

    fn enter(&mut self, ctx: &GateContext, conn: &mut dyn FallbackConnection) -> Result<StageOutcome> {
        let challenge = match ctx.pool.take_random() {
            Ok(challenge) => challenge,
            Err(ProtocolError::PoolExhausted) => {
                return Ok(StageOutcome::Failed(FailReason::CaptchaUnavailable))
            }
            Err(e) => return Err(e),
        };
        self.entered_at = Instant::now();
        self.tries = ctx.config.verification.max_tries;

        let version = conn.protocol_version();
        let alternate = conn.is_alternate_client();

        conn.delayed_write(
            &SetContainerSlot {
                window_id: 0,
                state_id: 0,
                slot: if alternate { HOTBAR_SLOT } else { OFFHAND_SLOT },
                count: 1,
                item_id: ctx.catalog.resolve(ResourceKey::FilledMap, version),
                map_id: MAP_ID,
            }
            .into(),
        )?;
        for packet in MapData::for_version(MAP_ID, challenge.pixels().clone(), version) {
            conn.delayed_write(&packet.into())?;
        }
        conn.delayed_write(&ctx.prepared.position)?;
        conn.delayed_write(if alternate {
            &ctx.prepared.abilities_alternate
        } else {
            &ctx.prepared.abilities
        })?;
        conn.delayed_write(&ctx.prepared.enter_code)?;
        conn.flush()?;

        self.challenge = Some(challenge);
        Ok(StageOutcome::Continue)
    }

    fn handle(
        &mut self,
        ctx: &GateContext,
        conn: &mut dyn FallbackConnection,
        inbound: &Inbound,
    ) -> Result<StageOutcome> {
        // Checked before anything else, so a late correct answer still times out
        if self.entered_at.elapsed() > ctx.config.verification.max_duration {
            return Ok(StageOutcome::TimedOut);
        }

        let Inbound::Packet(packet) = inbound else {
            return Ok(StageOutcome::Continue);
        };
        match packet {
            ServerboundPacket::ChatMessage(chat) => return self.check_answer(ctx, conn, &chat.message),
            ServerboundPacket::SetPlayerPosition(_) | ServerboundPacket::SetPlayerPositionRotation(_) => {
                self.on_movement(ctx, conn)?;
            }
            ServerboundPacket::LoginStart(_) | ServerboundPacket::KeepAliveResponse(_) => {}
        }
        Ok(StageOutcome::Continue)
    }
}

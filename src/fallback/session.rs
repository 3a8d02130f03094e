//! # Verification Session
//!
//! Per-connection state machine. A session waits for the login trigger, then
//! runs its stages in order; the first stage to fail ends the session.
//!
//! ```text
//! AwaitingTrigger -> CaptchaPresented -> Passed
//!                                     -> Failed(reason)
//!                                     -> TimedOut
//!                 -> Disconnected (peer left)
//! ```
//!
//! Terminal states are final. Packets arriving after a verdict are ignored.
//!
//! Sessions are driven by one connection task at a time and share nothing
//! mutable with each other.

use std::collections::VecDeque;
use std::fmt;
use std::sync::Arc;

use bytes::Bytes;
use tracing::{debug, info, instrument, warn};

use crate::error::{debug_traces, ProtocolError, Result};
use crate::fallback::captcha_stage::CaptchaStage;
use crate::fallback::connection::FallbackConnection;
use crate::fallback::prepared::DisconnectMessages;
use crate::fallback::GateContext;
use crate::protocol::component::Component;
use crate::protocol::dispatcher::Inbound;
use crate::protocol::packets::login::MAX_USERNAME_LENGTH;
use crate::protocol::packets::ServerboundPacket;
use crate::protocol::registry::ConnectionState;
use crate::utils::metrics::global_metrics;

/// Why a session failed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FailReason {
    TooManyAttempts,
    InvalidUsername,
    MalformedPacket,
    /// No challenge was ready when the stage started
    CaptchaUnavailable,
    /// A packet could not be encoded for the client's revision
    Internal,
}

impl FailReason {
    pub fn as_str(self) -> &'static str {
        match self {
            FailReason::TooManyAttempts => "too_many_attempts",
            FailReason::InvalidUsername => "invalid_username",
            FailReason::MalformedPacket => "malformed_packet",
            FailReason::CaptchaUnavailable => "captcha_unavailable",
            FailReason::Internal => "internal",
        }
    }

    /// Disconnect reason shown to the client
    pub fn message(self, messages: &DisconnectMessages) -> &Component {
        match self {
            FailReason::TooManyAttempts => &messages.too_many_attempts,
            FailReason::InvalidUsername => &messages.invalid_username,
            FailReason::CaptchaUnavailable => &messages.currently_preparing,
            FailReason::MalformedPacket | FailReason::Internal => &messages.unexpected_error,
        }
    }
}

impl fmt::Display for FailReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Waiting for the login start packet
    AwaitingTrigger,
    /// The map challenge has been sent
    CaptchaPresented,
    Passed,
    Failed(FailReason),
    TimedOut,
    /// The peer closed the connection first
    Disconnected,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        !matches!(
            self,
            SessionState::AwaitingTrigger | SessionState::CaptchaPresented
        )
    }

    /// Connection state inbound frames are routed in
    pub fn connection_state(self) -> ConnectionState {
        match self {
            SessionState::AwaitingTrigger => ConnectionState::Login,
            _ => ConnectionState::Play,
        }
    }
}

/// What a stage decided about the packet it just saw
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    Continue,
    Passed,
    Failed(FailReason),
    TimedOut,
}

/// One step of verification.
///
/// A stage is entered once, then sees every inbound packet until it returns
/// anything other than [`StageOutcome::Continue`].
pub trait VerificationStage: Send {
    fn name(&self) -> &'static str;

    /// Session state reported while this stage is active
    fn state(&self) -> SessionState;

    /// Send the stage's setup packets.
    fn enter(&mut self, ctx: &GateContext, conn: &mut dyn FallbackConnection) -> Result<StageOutcome>;

    fn handle(
        &mut self,
        ctx: &GateContext,
        conn: &mut dyn FallbackConnection,
        inbound: &Inbound,
    ) -> Result<StageOutcome>;
}

/// Usernames vanilla clients can log in with
pub fn is_valid_username(name: &str) -> bool {
    (1..=MAX_USERNAME_LENGTH).contains(&name.len())
        && name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_')
}

pub struct VerificationSession {
    ctx: Arc<GateContext>,
    state: SessionState,
    username: Option<String>,
    pending: VecDeque<Box<dyn VerificationStage>>,
    current: Option<Box<dyn VerificationStage>>,
}

impl fmt::Debug for VerificationSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("VerificationSession")
            .field("state", &self.state)
            .field("username", &self.username)
            .field("stage", &self.current.as_ref().map(|s| s.name()))
            .field("pending", &self.pending.len())
            .finish()
    }
}

impl VerificationSession {
    /// Session running the CAPTCHA stage
    pub fn new(ctx: Arc<GateContext>) -> Self {
        Self::with_stages(ctx, vec![Box::new(CaptchaStage::new())])
    }

    /// Session running `stages` in order
    pub fn with_stages(ctx: Arc<GateContext>, stages: Vec<Box<dyn VerificationStage>>) -> Self {
        Self {
            ctx,
            state: SessionState::AwaitingTrigger,
            username: None,
            pending: stages.into(),
            current: None,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Name of the active stage
    pub fn stage(&self) -> Option<&'static str> {
        self.current.as_ref().map(|s| s.name())
    }

    /// Begin verification for `username`.
    ///
    /// Ignored unless the session is still waiting for its trigger.
    #[instrument(skip_all, fields(username = %username))]
    pub fn start<C: FallbackConnection>(&mut self, conn: &mut C, username: &str) -> SessionState {
        if self.state != SessionState::AwaitingTrigger {
            return self.state;
        }
        self.username = Some(username.to_owned());

        if self.ctx.config.verification.validate_usernames && !is_valid_username(username) {
            debug!("Rejecting invalid username");
            return self.finish(conn, SessionState::Failed(FailReason::InvalidUsername));
        }

        global_metrics().session_started();
        debug!(version = %conn.protocol_version(), "Starting verification");
        self.advance(conn)
    }

    /// Decode and handle one frame (`[id] [body]`).
    pub fn receive<C: FallbackConnection>(&mut self, conn: &mut C, frame: Bytes) -> SessionState {
        if self.state.is_terminal() {
            return self.state;
        }
        let dispatched = self.ctx.dispatcher.dispatch(
            conn.protocol_version(),
            self.state.connection_state(),
            frame,
        );
        match dispatched {
            Ok(inbound) => self.handle_inbound(conn, inbound),
            Err(e) => {
                global_metrics().malformed_packet();
                if debug_traces() {
                    warn!(username = ?self.username, error = %e, "Malformed packet");
                } else {
                    debug!(username = ?self.username, "Malformed packet");
                }
                self.finish(conn, SessionState::Failed(FailReason::MalformedPacket))
            }
        }
    }

    /// Handle an already decoded packet
    pub fn handle<C: FallbackConnection>(
        &mut self,
        conn: &mut C,
        packet: ServerboundPacket,
    ) -> SessionState {
        self.handle_inbound(conn, Inbound::Packet(packet))
    }

    /// The peer disconnected
    pub fn close(&mut self) -> SessionState {
        if !self.state.is_terminal() {
            debug!(username = ?self.username, "Connection closed during verification");
            global_metrics().session_disconnected();
            self.current = None;
            self.pending.clear();
            self.state = SessionState::Disconnected;
        }
        self.state
    }

    fn handle_inbound<C: FallbackConnection>(&mut self, conn: &mut C, inbound: Inbound) -> SessionState {
        if self.state == SessionState::AwaitingTrigger {
            return match inbound {
                Inbound::Packet(ServerboundPacket::LoginStart(login)) => {
                    self.start(conn, &login.username)
                }
                _ => self.state,
            };
        }

        let Some(stage) = self.current.as_mut() else {
            return self.state;
        };
        match stage.handle(&self.ctx, conn, &inbound) {
            Ok(outcome) => self.apply(conn, outcome),
            Err(e) => self.fail_on_error(conn, e),
        }
    }

    /// Enter pending stages until one needs input or the queue is empty
    fn advance<C: FallbackConnection>(&mut self, conn: &mut C) -> SessionState {
        while let Some(mut stage) = self.pending.pop_front() {
            debug!(stage = stage.name(), "Entering stage");
            match stage.enter(&self.ctx, conn) {
                Ok(StageOutcome::Continue) => {
                    self.state = stage.state();
                    self.current = Some(stage);
                    return self.state;
                }
                Ok(StageOutcome::Passed) => continue,
                Ok(outcome) => return self.apply(conn, outcome),
                Err(e) => return self.fail_on_error(conn, e),
            }
        }
        self.finish(conn, SessionState::Passed)
    }

    fn apply<C: FallbackConnection>(&mut self, conn: &mut C, outcome: StageOutcome) -> SessionState {
        match outcome {
            StageOutcome::Continue => self.state,
            StageOutcome::Passed => {
                self.current = None;
                self.advance(conn)
            }
            StageOutcome::Failed(reason) => self.finish(conn, SessionState::Failed(reason)),
            StageOutcome::TimedOut => self.finish(conn, SessionState::TimedOut),
        }
    }

    fn fail_on_error<C: FallbackConnection>(&mut self, conn: &mut C, error: ProtocolError) -> SessionState {
        match error {
            ProtocolError::ConnectionClosed => self.close(),
            e => {
                warn!(username = ?self.username, error = %e, "Verification aborted");
                self.finish(conn, SessionState::Failed(FailReason::Internal))
            }
        }
    }

    /// Record the verdict and disconnect on failure
    fn finish<C: FallbackConnection>(&mut self, conn: &mut C, state: SessionState) -> SessionState {
        self.current = None;
        self.pending.clear();
        self.state = state;

        let elapsed_ms = conn.login_timer().delay();
        let metrics = global_metrics();
        let messages = &self.ctx.prepared.messages;
        let reason = match state {
            SessionState::Passed => {
                metrics.session_passed();
                info!(username = ?self.username, elapsed_ms, "Verification passed");
                None
            }
            SessionState::TimedOut => {
                metrics.session_timed_out();
                info!(username = ?self.username, elapsed_ms, "Verification timed out");
                Some(&messages.took_too_long)
            }
            SessionState::Failed(reason) => {
                if reason == FailReason::CaptchaUnavailable {
                    metrics.pool_miss();
                } else {
                    metrics.session_failed();
                }
                info!(username = ?self.username, %reason, elapsed_ms, "Verification failed");
                Some(reason.message(messages))
            }
            SessionState::AwaitingTrigger
            | SessionState::CaptchaPresented
            | SessionState::Disconnected => None,
        };

        if let Some(reason) = reason {
            if let Err(e) = conn.disconnect(reason) {
                debug!(error = %e, "Disconnect after verdict failed");
            }
        }
        state
    }
}

//! # Fallback Gate
//!
//! Verification flow for connections that reached the gate: a queue of stages
//! each client must clear before it is handed to the real server.
//!
//! ## Components
//! - **Connection**: what the gate needs from the host's pipeline
//! - **Prepared packets**: per-gate packets shared by every session
//! - **Session**: per-connection state machine driving the stages
//! - **CAPTCHA stage**: the map challenge
//!
//! ## Usage
//! ```rust,no_run
//! use bytes::Bytes;
//! use fallback_gate::config::FallbackConfig;
//! use fallback_gate::fallback::{FallbackGate, QueuedConnection};
//! use fallback_gate::protocol::version::ProtocolVersion;
//!
//! # async fn run(frame: Bytes) -> fallback_gate::error::Result<()> {
//! let gate = FallbackGate::new(FallbackConfig::default())?;
//! let _refill = gate.start_refill(&tokio::runtime::Handle::current());
//!
//! let mut conn = QueuedConnection::new(ProtocolVersion::V1_20_3);
//! let mut session = gate.session();
//! session.receive(&mut conn, frame);
//! if session.state().is_terminal() {
//!     // pass the verdict on to the host
//! }
//! # Ok(())
//! # }
//! ```

pub mod captcha_stage;
pub mod connection;
pub mod prepared;
pub mod session;

use std::sync::Arc;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::captcha::{CaptchaGenerator, CaptchaPool};
use crate::config::FallbackConfig;
use crate::core::frame::FrameCodec;
use crate::error::{set_debug_traces, ProtocolError, Result};
use crate::protocol::dispatcher::Dispatcher;
use crate::protocol::registry::{packet_registry, PacketRegistry};
use crate::protocol::resource::{resource_catalog, ResourceCatalog};

pub use captcha_stage::CaptchaStage;
pub use connection::{FallbackConnection, LoginTimer, QueuedConnection};
pub use prepared::{DisconnectMessages, PreparedPackets};
pub use session::{FailReason, SessionState, StageOutcome, VerificationSession, VerificationStage};

/// Everything a session reads, shared between all sessions of a gate
pub struct GateContext {
    pub config: FallbackConfig,
    pub catalog: &'static ResourceCatalog,
    pub registry: &'static PacketRegistry,
    pub dispatcher: Dispatcher,
    pub prepared: PreparedPackets,
    pub pool: CaptchaPool,
}

/// Entry point: validated configuration, revision tables and the challenge pool
#[derive(Clone)]
pub struct FallbackGate {
    ctx: Arc<GateContext>,
}

impl FallbackGate {
    /// Build a gate.
    ///
    /// Revision tables are validated here so a gap fails at startup rather than
    /// on the first client of an unusual revision.
    ///
    /// # Errors
    /// `ConfigError` for invalid settings or an inconsistent revision table.
    pub fn new(config: FallbackConfig) -> Result<Self> {
        let (warnings, errors): (Vec<_>, Vec<_>) = config
            .validate()
            .into_iter()
            .partition(|e| e.starts_with("WARNING"));
        if !errors.is_empty() {
            return Err(ProtocolError::ConfigError(format!(
                "Configuration validation failed:\n  - {}",
                errors.join("\n  - ")
            )));
        }
        for warning in &warnings {
            warn!("{warning}");
        }

        set_debug_traces(config.verification.debug_traces);

        let catalog = resource_catalog()?;
        let registry = packet_registry()?;
        let dispatcher = Dispatcher::new(registry);
        let prepared = PreparedPackets::new(&config, catalog);
        let pool = CaptchaPool::new(
            CaptchaGenerator::from_config(&config.captcha)?,
            config.captcha.precompute,
            config.captcha.refill_threshold,
        );

        info!(
            max_tries = config.verification.max_tries,
            max_duration_ms = config.verification.max_duration.as_millis() as u64,
            gamemode = ?config.verification.gamemode,
            precompute = config.captcha.precompute,
            "Fallback gate ready"
        );

        Ok(Self {
            ctx: Arc::new(GateContext {
                config,
                catalog,
                registry,
                dispatcher,
                prepared,
                pool,
            }),
        })
    }

    /// Start a session for a connection that just reached the gate
    pub fn session(&self) -> VerificationSession {
        VerificationSession::new(Arc::clone(&self.ctx))
    }

    /// Start the background pool refill on `handle`. `None` if already running.
    pub fn start_refill(&self, handle: &Handle) -> Option<JoinHandle<()>> {
        self.ctx.pool.spawn_refill(handle)
    }

    /// Frame codec bounded by `verification.max_frame_size`
    pub fn frame_codec(&self) -> FrameCodec {
        FrameCodec::new(self.ctx.config.verification.max_frame_size)
    }

    pub fn pool(&self) -> &CaptchaPool {
        &self.ctx.pool
    }

    pub fn config(&self) -> &FallbackConfig {
        &self.ctx.config
    }

    pub fn context(&self) -> &Arc<GateContext> {
        &self.ctx
    }
}

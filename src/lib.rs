//! # Fallback Gate
//!
//! Login gate for Minecraft servers that tells real clients from bots before
//! they reach the game. A connection is spawned into a void world holding a map
//! with a CAPTCHA on it; typing the code in chat passes verification.
//!
//! One gate serves every client revision from 1.7.2 to 1.21. Packet ids, block
//! ids and field layouts are looked up per revision from tables validated at
//! startup.
//!
//! ## Modules
//! - [`core`]: VarInt codec, tag trees and stream framing
//! - [`protocol`]: revision catalog, id tables and typed packets
//! - [`captcha`]: challenge rendering and the ready pool
//! - [`fallback`]: per-connection verification sessions
//! - [`config`]: TOML and environment configuration
//! - [`utils`]: logging setup and counters
//!
//! ## Quick Start
//! ```rust,no_run
//! use fallback_gate::{FallbackConfig, FallbackGate, QueuedConnection, ProtocolVersion};
//!
//! # async fn run() -> fallback_gate::Result<()> {
//! let config = FallbackConfig::from_env()?;
//! fallback_gate::utils::logging::init(&config.logging)?;
//!
//! let gate = FallbackGate::new(config)?;
//! let _refill = gate.start_refill(&tokio::runtime::Handle::current());
//!
//! let mut conn = QueuedConnection::new(ProtocolVersion::V1_8);
//! let mut session = gate.session();
//! session.start(&mut conn, "Notch");
//! # Ok(())
//! # }
//! ```

#![warn(clippy::unwrap_used, clippy::expect_used)]

pub mod captcha;
pub mod config;
pub mod core;
pub mod error;
pub mod fallback;
pub mod protocol;
pub mod utils;

pub use config::FallbackConfig;
pub use error::{Malformed, ProtocolError, Result};
pub use fallback::{
    FailReason, FallbackConnection, FallbackGate, QueuedConnection, SessionState,
    VerificationSession,
};
pub use protocol::version::ProtocolVersion;

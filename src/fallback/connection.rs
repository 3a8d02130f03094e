//! Host connection handle.
//!
//! The gate never owns a socket. The host implements [`FallbackConnection`] over
//! its own pipeline; [`QueuedConnection`] is a ready-made implementation that
//! buffers packets and hands encoded frames back to the host.

use bytes::BytesMut;
use tokio::time::Instant;
use tokio_util::codec::Encoder;

use crate::core::frame::FrameCodec;
use crate::error::{ProtocolError, Result};
use crate::protocol::component::Component;
use crate::protocol::packets::{encode_packet, ClientboundPacket};
use crate::protocol::version::ProtocolVersion;

/// Time since the connection reached the gate
#[derive(Debug, Clone, Copy)]
pub struct LoginTimer {
    start: Instant,
}

impl LoginTimer {
    pub fn start() -> Self {
        Self {
            start: Instant::now(),
        }
    }

    /// Milliseconds since start
    pub fn delay(&self) -> u64 {
        self.start.elapsed().as_millis() as u64
    }

    /// True once more than `millis` have passed
    pub fn elapsed(&self, millis: u64) -> bool {
        self.delay() > millis
    }
}

impl Default for LoginTimer {
    fn default() -> Self {
        Self::start()
    }
}

/// What the gate needs from a connection
pub trait FallbackConnection {
    /// Revision negotiated in the handshake, fixed for the connection
    fn protocol_version(&self) -> ProtocolVersion;

    /// True for Bedrock clients bridged through a translation layer
    fn is_alternate_client(&self) -> bool;

    fn login_timer(&self) -> &LoginTimer;

    /// Queue a packet until the next flush
    fn delayed_write(&mut self, packet: &ClientboundPacket) -> Result<()>;

    /// Send all queued packets
    fn flush(&mut self) -> Result<()>;

    /// Queue and flush a packet
    fn write(&mut self, packet: &ClientboundPacket) -> Result<()> {
        self.delayed_write(packet)?;
        self.flush()
    }

    /// Close the connection with a reason
    fn disconnect(&mut self, reason: &Component) -> Result<()>;
}

/// Buffered connection that keeps packets until the host drains them
#[derive(Debug)]
pub struct QueuedConnection {
    version: ProtocolVersion,
    alternate: bool,
    timer: LoginTimer,
    pending: Vec<ClientboundPacket>,
    sent: Vec<ClientboundPacket>,
    flushes: usize,
    disconnect_reason: Option<Component>,
}

impl QueuedConnection {
    pub fn new(version: ProtocolVersion) -> Self {
        Self {
            version,
            alternate: false,
            timer: LoginTimer::start(),
            pending: Vec::new(),
            sent: Vec::new(),
            flushes: 0,
            disconnect_reason: None,
        }
    }

    /// Mark the connection as a bridged Bedrock client
    pub fn alternate(mut self) -> Self {
        self.alternate = true;
        self
    }

    /// Packets flushed and not yet drained
    pub fn sent(&self) -> &[ClientboundPacket] {
        &self.sent
    }

    pub fn take_sent(&mut self) -> Vec<ClientboundPacket> {
        std::mem::take(&mut self.sent)
    }

    /// Packets written but not flushed
    pub fn pending(&self) -> &[ClientboundPacket] {
        &self.pending
    }

    pub fn flush_count(&self) -> usize {
        self.flushes
    }

    pub fn disconnect_reason(&self) -> Option<&Component> {
        self.disconnect_reason.as_ref()
    }

    pub fn is_closed(&self) -> bool {
        self.disconnect_reason.is_some()
    }

    /// Drain flushed packets into `dst` as length-prefixed frames.
    ///
    /// Returns the number of frames written.
    pub fn encode_sent(&mut self, codec: &mut FrameCodec, dst: &mut BytesMut) -> Result<usize> {
        let packets = self.take_sent();
        for packet in &packets {
            let body = encode_packet(packet, self.version)?;
            codec.encode(body.freeze(), dst)?;
        }
        Ok(packets.len())
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(ProtocolError::ConnectionClosed);
        }
        Ok(())
    }
}

impl FallbackConnection for QueuedConnection {
    fn protocol_version(&self) -> ProtocolVersion {
        self.version
    }

    fn is_alternate_client(&self) -> bool {
        self.alternate
    }

    fn login_timer(&self) -> &LoginTimer {
        &self.timer
    }

    fn delayed_write(&mut self, packet: &ClientboundPacket) -> Result<()> {
        self.ensure_open()?;
        self.pending.push(packet.clone());
        Ok(())
    }

    fn flush(&mut self) -> Result<()> {
        self.ensure_open()?;
        self.sent.append(&mut self.pending);
        self.flushes += 1;
        Ok(())
    }

    fn disconnect(&mut self, reason: &Component) -> Result<()> {
        self.ensure_open()?;
        self.pending.clear();
        self.disconnect_reason = Some(reason.clone());
        Ok(())
    }
}

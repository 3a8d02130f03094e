//! Observability and Metrics
//!
//! Verification counters for monitoring how many sessions pass, fail and why.
//!
//! Uses atomic counters for thread-safe metrics collection.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::info;

/// Global metrics collector for verification sessions
#[derive(Debug)]
pub struct Metrics {
    /// Sessions that entered their first stage
    pub sessions_started: AtomicU64,
    /// Sessions that answered correctly
    pub sessions_passed: AtomicU64,
    /// Sessions that failed (any reason other than timeout)
    pub sessions_failed: AtomicU64,
    /// Sessions that ran out of time
    pub sessions_timed_out: AtomicU64,
    /// Sessions closed by the peer before a verdict
    pub sessions_disconnected: AtomicU64,
    /// Frames rejected by the decoder
    pub malformed_packets: AtomicU64,
    /// Sessions turned away because no challenge was ready
    pub pool_misses: AtomicU64,
    /// Challenges rendered
    pub challenges_generated: AtomicU64,
    /// Start time for uptime calculation
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            sessions_started: AtomicU64::new(0),
            sessions_passed: AtomicU64::new(0),
            sessions_failed: AtomicU64::new(0),
            sessions_timed_out: AtomicU64::new(0),
            sessions_disconnected: AtomicU64::new(0),
            malformed_packets: AtomicU64::new(0),
            pool_misses: AtomicU64::new(0),
            challenges_generated: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a session entering verification
    pub fn session_started(&self) {
        self.sessions_started.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a passed session
    pub fn session_passed(&self) {
        self.sessions_passed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a failed session
    pub fn session_failed(&self) {
        self.sessions_failed.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a timed out session
    pub fn session_timed_out(&self) {
        self.sessions_timed_out.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a session closed by the peer
    pub fn session_disconnected(&self) {
        self.sessions_disconnected.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a rejected frame
    pub fn malformed_packet(&self) {
        self.malformed_packets.fetch_add(1, Ordering::Relaxed);
    }

    /// Record an empty pool at session start
    pub fn pool_miss(&self) {
        self.pool_misses.fetch_add(1, Ordering::Relaxed);
    }

    /// Record rendered challenges
    pub fn challenges_generated(&self, count: u64) {
        self.challenges_generated.fetch_add(count, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            sessions_started: self.sessions_started.load(Ordering::Relaxed),
            sessions_passed: self.sessions_passed.load(Ordering::Relaxed),
            sessions_failed: self.sessions_failed.load(Ordering::Relaxed),
            sessions_timed_out: self.sessions_timed_out.load(Ordering::Relaxed),
            sessions_disconnected: self.sessions_disconnected.load(Ordering::Relaxed),
            malformed_packets: self.malformed_packets.load(Ordering::Relaxed),
            pool_misses: self.pool_misses.load(Ordering::Relaxed),
            challenges_generated: self.challenges_generated.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            sessions_started = snapshot.sessions_started,
            sessions_passed = snapshot.sessions_passed,
            sessions_failed = snapshot.sessions_failed,
            sessions_timed_out = snapshot.sessions_timed_out,
            sessions_disconnected = snapshot.sessions_disconnected,
            malformed_packets = snapshot.malformed_packets,
            pool_misses = snapshot.pool_misses,
            challenges_generated = snapshot.challenges_generated,
            uptime_seconds = snapshot.uptime_seconds,
            "Verification metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone)]
pub struct MetricsSnapshot {
    pub sessions_started: u64,
    pub sessions_passed: u64,
    pub sessions_failed: u64,
    pub sessions_timed_out: u64,
    pub sessions_disconnected: u64,
    pub malformed_packets: u64,
    pub pool_misses: u64,
    pub challenges_generated: u64,
    pub uptime_seconds: u64,
}

/// Global metrics instance (lazy static for simplicity)
static METRICS: once_cell::sync::Lazy<Metrics> = once_cell::sync::Lazy::new(Metrics::new);

/// Get the global metrics instance
pub fn global_metrics() -> &'static Metrics {
    &METRICS
}

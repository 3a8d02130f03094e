//! # Challenge Pool
//!
//! Pre-rendered challenges kept ready so session setup never waits on rendering.
//!
//! ## Performance
//! - `take_random` is a lock, an index draw and a `swap_remove`
//! - Rendering runs on the blocking thread pool, never on a connection task
//! - The refill task wakes as soon as a take drops the pool under its threshold
//!
//! ## Usage
//! ```rust,no_run
//! use fallback_gate::captcha::{CaptchaGenerator, CaptchaPool};
//!
//! # async fn run() -> fallback_gate::error::Result<()> {
//! let generator = CaptchaGenerator::new("abcdefhjkmnoprstuxyz", 5)?;
//! let pool = CaptchaPool::new(generator, 500, 100);
//! let _refill = pool.spawn_refill(&tokio::runtime::Handle::current());
//! let challenge = pool.take_random()?;
//! # Ok(())
//! # }
//! ```

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use rand::Rng;
use tokio::runtime::Handle;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::captcha::render::CaptchaGenerator;
use crate::captcha::CaptchaChallenge;
use crate::error::{ProtocolError, Result};
use crate::utils::metrics::global_metrics;

/// How often the refill task checks the pool without being woken
const REFILL_INTERVAL: Duration = Duration::from_secs(5);

/// Challenges rendered per blocking job
const RENDER_BATCH: usize = 50;

/// Thread-safe pool of ready challenges
#[derive(Clone)]
pub struct CaptchaPool {
    challenges: Arc<Mutex<Vec<CaptchaChallenge>>>,
    generator: Arc<CaptchaGenerator>,
    precompute: usize,
    refill_threshold: usize,
    wake: Arc<Notify>,
    refilling: Arc<AtomicBool>,
}

impl CaptchaPool {
    /// Create an empty pool that refills up to `precompute` challenges.
    pub fn new(generator: CaptchaGenerator, precompute: usize, refill_threshold: usize) -> Self {
        Self {
            challenges: Arc::new(Mutex::new(Vec::with_capacity(precompute))),
            generator: Arc::new(generator),
            precompute,
            refill_threshold,
            wake: Arc::new(Notify::new()),
            refilling: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Whether at least one challenge is ready
    pub fn is_available(&self) -> bool {
        self.len() > 0
    }

    /// Get the current number of ready challenges
    pub fn len(&self) -> usize {
        self.challenges.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Remove and return a random challenge.
    ///
    /// # Errors
    /// `PoolExhausted` if nothing is ready.
    pub fn take_random(&self) -> Result<CaptchaChallenge> {
        let (challenge, remaining) = {
            let mut pool = self
                .challenges
                .lock()
                .map_err(|_| ProtocolError::PoolExhausted)?;
            if pool.is_empty() {
                return Err(ProtocolError::PoolExhausted);
            }
            let index = rand::rng().random_range(0..pool.len());
            (pool.swap_remove(index), pool.len())
        };

        if remaining < self.refill_threshold {
            self.wake.notify_one();
        }
        Ok(challenge)
    }

    /// Render `count` challenges on the current thread and add them.
    ///
    /// Returns how many were added.
    pub fn fill(&self, count: usize) -> usize {
        let batch = render_batch(&self.generator, count);
        self.extend(batch)
    }

    fn extend(&self, batch: Vec<CaptchaChallenge>) -> usize {
        let added = batch.len();
        if let Ok(mut pool) = self.challenges.lock() {
            pool.extend(batch);
            global_metrics().challenges_generated(added as u64);
            added
        } else {
            0
        }
    }

    /// Number of challenges missing from a full pool
    fn missing(&self) -> usize {
        self.precompute.saturating_sub(self.len())
    }

    /// Start the background refill task on `handle`.
    ///
    /// The task fills the pool to `precompute` immediately, then tops it back up
    /// whenever it drops below `refill_threshold`. At most one task runs per pool;
    /// a second call returns `None`.
    pub fn spawn_refill(&self, handle: &Handle) -> Option<JoinHandle<()>> {
        if self.refilling.swap(true, Ordering::AcqRel) {
            return None;
        }
        let pool = self.clone();
        Some(handle.spawn(async move {
            pool.refill_to_precompute().await;
            loop {
                // Either a take woke us or the interval passed
                let _ = tokio::time::timeout(REFILL_INTERVAL, pool.wake.notified()).await;
                if pool.len() < pool.refill_threshold {
                    pool.refill_to_precompute().await;
                }
            }
        }))
    }

    async fn refill_to_precompute(&self) {
        let mut missing = self.missing();
        if missing == 0 {
            return;
        }
        debug!(missing, "Refilling CAPTCHA pool");

        while missing > 0 {
            let count = missing.min(RENDER_BATCH);
            let generator = Arc::clone(&self.generator);
            match tokio::task::spawn_blocking(move || render_batch(&generator, count)).await {
                Ok(batch) => {
                    self.extend(batch);
                }
                Err(e) => {
                    warn!(error = %e, "CAPTCHA render job failed");
                    return;
                }
            }
            missing = self.missing();
        }
        debug!(ready = self.len(), "CAPTCHA pool refilled");
    }
}

fn render_batch(generator: &CaptchaGenerator, count: usize) -> Vec<CaptchaChallenge> {
    let mut rng = rand::rng();
    (0..count).map(|_| generator.generate(&mut rng)).collect()
}

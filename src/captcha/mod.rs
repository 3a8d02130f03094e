//! # Challenge Content
//!
//! Human-solvable map CAPTCHAs and the pool that keeps them ready.
//!
//! ## Components
//! - **Font**: built-in 5x7 bitmap glyphs
//! - **Render**: draws an answer onto a 128x128 map canvas
//! - **Pool**: background-refilled store handing each challenge to one session

pub mod font;
pub mod pool;
pub mod render;

use std::sync::Arc;

pub use pool::CaptchaPool;
pub use render::CaptchaGenerator;

/// A rendered map and the answer it shows
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CaptchaChallenge {
    pixels: Arc<[u8]>,
    answer: String,
}

impl CaptchaChallenge {
    /// The answer is stored lower-cased
    pub fn new(pixels: Arc<[u8]>, answer: &str) -> Self {
        Self {
            pixels,
            answer: answer.to_lowercase(),
        }
    }

    /// Row-major palette indices, 128x128
    pub fn pixels(&self) -> &Arc<[u8]> {
        &self.pixels
    }

    pub fn answer(&self) -> &str {
        &self.answer
    }
}

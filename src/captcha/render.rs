//! Map canvas rendering.
//!
//! Draws the answer onto a 128x128 map with per-glyph jitter, a random scale,
//! noise dots and strike lines. Colours are map palette indices (`base * 4 +
//! shade`) taken from the base colours 1.7 already knows, so the same canvas
//! is valid on every revision.

use std::sync::Arc;

use rand::seq::IndexedRandom;
use rand::Rng;

use crate::captcha::font::{glyph, is_set, GLYPH_HEIGHT, GLYPH_WIDTH};
use crate::captcha::CaptchaChallenge;
use crate::config::CaptchaConfig;
use crate::error::{ProtocolError, Result};

/// Side length of the canvas
pub const CANVAS_SIZE: usize = 128;

/// Highest palette index valid on every revision
pub const MAX_PORTABLE_COLOR: u8 = 55;

// snow, sand and wool at full brightness
const BACKGROUNDS: [u8; 3] = [34, 10, 14];
// water, fire, plant, wood and stone at the darkest shade
const INKS: [u8; 5] = [51, 19, 31, 55, 47];
// stone, metal and clay at medium shades
const NOISE: [u8; 4] = [44, 25, 37, 45];

/// Renders random challenges from a fixed alphabet
#[derive(Debug, Clone)]
pub struct CaptchaGenerator {
    alphabet: Vec<char>,
    length: usize,
}

impl CaptchaGenerator {
    /// # Errors
    /// `ConfigError` if the alphabet is empty, has a character without a glyph,
    /// or `length` cannot fit on the canvas.
    pub fn new(alphabet: &str, length: usize) -> Result<Self> {
        let alphabet: Vec<char> = alphabet.chars().collect();
        if alphabet.is_empty() {
            return Err(ProtocolError::ConfigError("CAPTCHA alphabet is empty".into()));
        }
        if let Some(c) = alphabet.iter().find(|c| glyph(**c).is_none()) {
            return Err(ProtocolError::ConfigError(format!(
                "No glyph for CAPTCHA character '{c}'"
            )));
        }
        if length == 0 || layout_width(length, 2) > CANVAS_SIZE {
            return Err(ProtocolError::ConfigError(format!(
                "CAPTCHA length {length} does not fit on a map"
            )));
        }
        Ok(Self { alphabet, length })
    }

    pub fn from_config(config: &CaptchaConfig) -> Result<Self> {
        Self::new(&config.alphabet, config.length)
    }

    /// Draw a random answer
    pub fn random_answer(&self, rng: &mut impl Rng) -> String {
        (0..self.length)
            .filter_map(|_| self.alphabet.choose(rng).copied())
            .collect()
    }

    /// Render a fresh challenge
    pub fn generate(&self, rng: &mut impl Rng) -> CaptchaChallenge {
        let answer = self.random_answer(rng);
        let pixels = render(&answer, rng);
        CaptchaChallenge::new(pixels, &answer)
    }
}

/// Width of `count` glyphs at `scale` including spacing
fn layout_width(count: usize, scale: usize) -> usize {
    count * GLYPH_WIDTH * scale + count.saturating_sub(1) * (scale + 1)
}

struct Canvas {
    pixels: Vec<u8>,
}

impl Canvas {
    fn new(background: u8) -> Self {
        Self {
            pixels: vec![background; CANVAS_SIZE * CANVAS_SIZE],
        }
    }

    /// Out-of-bounds pixels are dropped
    fn set(&mut self, x: i32, y: i32, color: u8) {
        if (0..CANVAS_SIZE as i32).contains(&x) && (0..CANVAS_SIZE as i32).contains(&y) {
            self.pixels[y as usize * CANVAS_SIZE + x as usize] = color;
        }
    }

    fn line(&mut self, (mut x0, mut y0): (i32, i32), (x1, y1): (i32, i32), color: u8) {
        let dx = (x1 - x0).abs();
        let dy = -(y1 - y0).abs();
        let sx = if x0 < x1 { 1 } else { -1 };
        let sy = if y0 < y1 { 1 } else { -1 };
        let mut err = dx + dy;
        loop {
            self.set(x0, y0, color);
            if x0 == x1 && y0 == y1 {
                return;
            }
            let e2 = 2 * err;
            if e2 >= dy {
                err += dy;
                x0 += sx;
            }
            if e2 <= dx {
                err += dx;
                y0 += sy;
            }
        }
    }
}

/// Render `text` onto a fresh canvas
pub fn render(text: &str, rng: &mut impl Rng) -> Arc<[u8]> {
    let count = text.chars().count();
    let mut scale = rng.random_range(2..=3usize);
    if layout_width(count, scale) > CANVAS_SIZE - 8 {
        scale = 2;
    }
    let background = BACKGROUNDS.choose(rng).copied().unwrap_or(BACKGROUNDS[0]);
    let mut canvas = Canvas::new(background);

    let advance = (GLYPH_WIDTH * scale + scale + 1) as i32;
    let start_x = (CANVAS_SIZE.saturating_sub(layout_width(count, scale)) / 2) as i32;
    let base_y = ((CANVAS_SIZE - GLYPH_HEIGHT * scale) / 2) as i32;

    for (i, c) in text.chars().enumerate() {
        let Some(glyph) = glyph(c) else { continue };
        let ink = INKS.choose(rng).copied().unwrap_or(INKS[0]);
        let origin_x = start_x + i as i32 * advance + rng.random_range(-2..=2);
        let origin_y = base_y + rng.random_range(-12..=12);
        // Horizontal shift per row, a cheap italic
        let shear = rng.random_range(-1..=1);

        for row in 0..GLYPH_HEIGHT {
            let row_shift = shear * (GLYPH_HEIGHT as i32 / 2 - row as i32) / 2;
            for col in 0..GLYPH_WIDTH {
                if !is_set(glyph, col, row) {
                    continue;
                }
                for dy in 0..scale {
                    for dx in 0..scale {
                        canvas.set(
                            origin_x + row_shift + (col * scale + dx) as i32,
                            origin_y + (row * scale + dy) as i32,
                            ink,
                        );
                    }
                }
            }
        }
    }

    for _ in 0..rng.random_range(300..=500) {
        let color = NOISE.choose(rng).copied().unwrap_or(NOISE[0]);
        let x = rng.random_range(0..CANVAS_SIZE as i32);
        let y = rng.random_range(0..CANVAS_SIZE as i32);
        canvas.set(x, y, color);
    }

    for _ in 0..rng.random_range(2..=3) {
        let color = INKS.choose(rng).copied().unwrap_or(INKS[0]);
        let from = (0, rng.random_range(base_y - 8..base_y + 30));
        let to = (CANVAS_SIZE as i32 - 1, rng.random_range(base_y - 8..base_y + 30));
        canvas.line(from, to, color);
    }

    canvas.pixels.into()
}

//! Near-white → transparent reclassification.
//!
//! A pixel whose red, green and blue samples are all strictly above the
//! threshold becomes `(255, 255, 255, 0)`. Every other pixel keeps its RGB
//! samples bit-for-bit and gets alpha 255. Nothing is blended or dithered, so
//! anti-aliased edges just above the threshold disappear entirely and those
//! just below stay fully opaque.

use crate::buffer::{Channels, PixelBuffer};

/// Default per-channel threshold.
pub const DEFAULT_THRESHOLD: u8 = 200;

/// Fully transparent white.
pub const TRANSPARENT: [u8; 4] = [255, 255, 255, 0];

/// The per-pixel rule applied by [`TransparencyRule::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransparencyRule {
    threshold: u8,
}

impl Default for TransparencyRule {
    fn default() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
        }
    }
}

impl TransparencyRule {
    pub fn new(threshold: u8) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> u8 {
        self.threshold
    }

    /// Whether an RGB triple counts as background.
    #[inline]
    pub fn is_background(&self, r: u8, g: u8, b: u8) -> bool {
        r > self.threshold && g > self.threshold && b > self.threshold
    }

    /// Map one RGB pixel to RGBA.
    #[inline]
    pub fn classify(&self, [r, g, b]: [u8; 3]) -> [u8; 4] {
        if self.is_background(r, g, b) {
            TRANSPARENT
        } else {
            [r, g, b, 255]
        }
    }

    /// Produce an RGBA buffer of the same size.
    ///
    /// RGB input is the normal case. RGBA input is accepted too: its alpha is
    /// discarded and recomputed from the colour samples.
    pub fn apply(&self, buffer: &PixelBuffer) -> PixelBuffer {
        let mut out = Vec::with_capacity(buffer.width() as usize * buffer.height() as usize * 4);
        // Chunks are 3 or 4 samples long.
        for px in buffer.pixels() {
            out.extend_from_slice(&self.classify([px[0], px[1], px[2]]));
        }
        PixelBuffer::from_parts(buffer.width(), buffer.height(), Channels::Rgba, out)
    }
}

/// Apply the default rule (threshold 200).
pub fn apply(buffer: &PixelBuffer) -> PixelBuffer {
    TransparencyRule::default().apply(buffer)
}

//! Palette quantization
//!
//! Frames that already fit the palette keep their exact colors in order of
//! first appearance. Larger color sets are reduced with NeuQuant and every
//! distinct color is mapped to the network's closest entry.

use color_quant::NeuQuant;
use std::collections::{HashMap, HashSet};
use svgif_core::{Error, QuantizedFrame, RasterFrame, Result, Rgb, MAX_PALETTE_LEN};
use tracing::debug;

/// Pixels below this alpha are written as transparent
pub const ALPHA_THRESHOLD: u8 = 128;

/// Default NeuQuant sampling factor (1 = every pixel, 30 = fastest)
pub const DEFAULT_SAMPLE_FACTOR: i32 = 10;

/// Reduces raster frames to at most `max_colors` palette entries
#[derive(Debug, Clone, Copy)]
pub struct FrameQuantizer {
    max_colors: usize,
    sample_factor: i32,
}

impl Default for FrameQuantizer {
    fn default() -> Self {
        Self {
            max_colors: MAX_PALETTE_LEN,
            sample_factor: DEFAULT_SAMPLE_FACTOR,
        }
    }
}

impl FrameQuantizer {
    /// Create a quantizer with a palette limit between 2 and 256
    pub fn new(max_colors: usize) -> Result<Self> {
        if !(2..=MAX_PALETTE_LEN).contains(&max_colors) {
            return Err(Error::Quantization(format!(
                "palette limit must be between 2 and {}, got {}",
                MAX_PALETTE_LEN, max_colors
            )));
        }
        Ok(Self {
            max_colors,
            ..Default::default()
        })
    }

    /// Builder pattern: set the NeuQuant sampling factor, clamped to 1..=30
    pub fn with_sample_factor(mut self, sample_factor: i32) -> Self {
        self.sample_factor = sample_factor.clamp(1, 30);
        self
    }

    pub fn max_colors(&self) -> usize {
        self.max_colors
    }

    /// Quantize one frame, consuming it
    pub fn quantize(&self, frame: RasterFrame, delay_cs: u16) -> Result<QuantizedFrame> {
        if !frame.is_valid() {
            return Err(Error::Quantization(format!(
                "frame {} has degenerate size {}x{}",
                frame.sequence, frame.width, frame.height
            )));
        }

        let mut first_seen = Vec::new();
        let mut seen = HashSet::new();
        let mut opaque = Vec::with_capacity(frame.data().len());
        let mut has_transparent = false;

        for px in frame.pixels() {
            if px[3] < ALPHA_THRESHOLD {
                has_transparent = true;
                continue;
            }
            let color = Rgb([px[0], px[1], px[2]]);
            if seen.insert(color) {
                first_seen.push(color);
            }
            opaque.extend_from_slice(&[px[0], px[1], px[2], u8::MAX]);
        }

        let budget = self.max_colors - usize::from(has_transparent);
        let (mut palette, lookup) = if first_seen.len() <= budget {
            let lookup = first_seen
                .iter()
                .enumerate()
                .map(|(i, &c)| (c, i as u8))
                .collect::<HashMap<_, _>>();
            (first_seen, lookup)
        } else {
            let nq = NeuQuant::new(self.sample_factor, budget, &opaque);
            let palette = nq
                .color_map_rgb()
                .chunks_exact(3)
                .map(|c| Rgb([c[0], c[1], c[2]]))
                .collect::<Vec<_>>();
            let lookup = first_seen
                .iter()
                .map(|&c| (c, nq.index_of(&[c.r(), c.g(), c.b(), u8::MAX]) as u8))
                .collect::<HashMap<_, _>>();
            (palette, lookup)
        };

        let transparent = if has_transparent {
            palette.push(Rgb::default());
            Some((palette.len() - 1) as u8)
        } else {
            None
        };

        let indices = frame
            .pixels()
            .map(|px| match transparent {
                Some(t) if px[3] < ALPHA_THRESHOLD => t,
                _ => lookup[&Rgb([px[0], px[1], px[2]])],
            })
            .collect();

        debug!(
            "Quantized frame {}: {} palette entries, transparent={}",
            frame.sequence,
            palette.len(),
            has_transparent
        );

        QuantizedFrame::new(
            frame.width,
            frame.height,
            palette,
            indices,
            delay_cs,
            transparent,
        )
    }
}

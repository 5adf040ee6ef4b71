//! Frame representations for each pipeline stage
//!
//! Raster frames come out of the sampler, quantized frames out of the
//! quantizer, and an [`EncodedStream`] out of the muxer.

use crate::{Error, Result};
use bytes::Bytes;
use std::time::Duration;

/// Largest palette a GIF frame can carry
pub const MAX_PALETTE_LEN: usize = 256;

/// A captured snapshot of the source
#[derive(Clone)]
pub struct RasterFrame {
    /// Straight-alpha RGBA pixel data, row-major
    data: Vec<u8>,
    /// Frame width
    pub width: u32,
    /// Frame height
    pub height: u32,
    /// Capture index within the sampling run
    pub sequence: u64,
    /// Offset from sampling start at which the snapshot was taken
    pub captured_at: Duration,
}

impl RasterFrame {
    /// Create a new frame from RGBA pixel data
    pub fn new(data: Vec<u8>, width: u32, height: u32) -> Result<Self> {
        let expected = width as usize * height as usize * 4;
        if data.len() != expected {
            return Err(Error::Source(format!(
                "raster {}x{} needs {} bytes, got {}",
                width,
                height,
                expected,
                data.len()
            )));
        }

        Ok(Self {
            data,
            width,
            height,
            sequence: 0,
            captured_at: Duration::ZERO,
        })
    }

    /// Create a frame filled with a single RGBA color
    pub fn solid(width: u32, height: u32, rgba: [u8; 4]) -> Self {
        let data = rgba
            .iter()
            .copied()
            .cycle()
            .take(width as usize * height as usize * 4)
            .collect();
        Self {
            data,
            width,
            height,
            sequence: 0,
            captured_at: Duration::ZERO,
        }
    }

    /// Tag the frame with its position in a sampling run
    pub fn stamped(mut self, sequence: u64, captured_at: Duration) -> Self {
        self.sequence = sequence;
        self.captured_at = captured_at;
        self
    }

    /// Get the raw pixel data as a slice
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Iterate over pixels as `[r, g, b, a]`
    pub fn pixels(&self) -> impl Iterator<Item = [u8; 4]> + '_ {
        self.data
            .chunks_exact(4)
            .map(|px| [px[0], px[1], px[2], px[3]])
    }

    /// Number of pixels in the frame
    pub fn pixel_count(&self) -> usize {
        self.width as usize * self.height as usize
    }

    /// Check if frame dimensions are valid
    pub fn is_valid(&self) -> bool {
        self.width > 0 && self.height > 0 && self.data.len() == self.pixel_count() * 4
    }
}

impl std::fmt::Debug for RasterFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RasterFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("sequence", &self.sequence)
            .field("captured_at", &self.captured_at)
            .field("size", &self.data.len())
            .finish()
    }
}

/// A palette entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct Rgb(pub [u8; 3]);

impl Rgb {
    pub const fn new(r: u8, g: u8, b: u8) -> Self {
        Self([r, g, b])
    }

    pub fn r(self) -> u8 {
        self.0[0]
    }

    pub fn g(self) -> u8 {
        self.0[1]
    }

    pub fn b(self) -> u8 {
        self.0[2]
    }
}

/// A palette-indexed frame ready for the GIF muxer
#[derive(Clone, PartialEq, Eq)]
pub struct QuantizedFrame {
    width: u32,
    height: u32,
    palette: Vec<Rgb>,
    indices: Vec<u8>,
    delay_cs: u16,
    transparent: Option<u8>,
}

impl QuantizedFrame {
    /// Build a frame, checking palette, index and delay invariants
    pub fn new(
        width: u32,
        height: u32,
        palette: Vec<Rgb>,
        indices: Vec<u8>,
        delay_cs: u16,
        transparent: Option<u8>,
    ) -> Result<Self> {
        if width == 0 || height == 0 {
            return Err(Error::Quantization(format!(
                "degenerate frame {}x{}",
                width, height
            )));
        }
        if palette.is_empty() || palette.len() > MAX_PALETTE_LEN {
            return Err(Error::Quantization(format!(
                "palette must hold 1..={} colors, got {}",
                MAX_PALETTE_LEN,
                palette.len()
            )));
        }
        let expected = width as usize * height as usize;
        if indices.len() != expected {
            return Err(Error::Quantization(format!(
                "index buffer holds {} entries, frame has {} pixels",
                indices.len(),
                expected
            )));
        }
        if let Some(bad) = indices.iter().find(|&&i| i as usize >= palette.len()) {
            return Err(Error::Quantization(format!(
                "index {} out of range for palette of {}",
                bad,
                palette.len()
            )));
        }
        if delay_cs == 0 {
            return Err(Error::Quantization("display duration must be at least 1 cs".into()));
        }
        if let Some(t) = transparent {
            if t as usize >= palette.len() {
                return Err(Error::Quantization(format!(
                    "transparent index {} out of range for palette of {}",
                    t,
                    palette.len()
                )));
            }
        }

        Ok(Self {
            width,
            height,
            palette,
            indices,
            delay_cs,
            transparent,
        })
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn palette(&self) -> &[Rgb] {
        &self.palette
    }

    pub fn indices(&self) -> &[u8] {
        &self.indices
    }

    /// Display duration in hundredths of a second
    pub fn delay_cs(&self) -> u16 {
        self.delay_cs
    }

    /// Palette index rendered as transparent, if any
    pub fn transparent(&self) -> Option<u8> {
        self.transparent
    }

    /// Resolve the palette color of pixel `(x, y)`
    pub fn color_at(&self, x: u32, y: u32) -> Option<Rgb> {
        if x >= self.width || y >= self.height {
            return None;
        }
        let index = self.indices[(y * self.width + x) as usize];
        self.palette.get(index as usize).copied()
    }
}

impl std::fmt::Debug for QuantizedFrame {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("QuantizedFrame")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("palette_len", &self.palette.len())
            .field("delay_cs", &self.delay_cs)
            .field("transparent", &self.transparent)
            .finish()
    }
}

/// Ordered, non-empty run of equally sized quantized frames
#[derive(Debug, Clone)]
pub struct FrameSequence {
    frames: Vec<QuantizedFrame>,
}

impl FrameSequence {
    /// Validate and wrap an ordered list of frames
    pub fn new(frames: Vec<QuantizedFrame>) -> Result<Self> {
        let first = frames
            .first()
            .ok_or_else(|| Error::Assembly("frame sequence is empty".into()))?;
        let dims = first.dimensions();

        if let Some((i, frame)) = frames
            .iter()
            .enumerate()
            .find(|(_, f)| f.dimensions() != dims)
        {
            return Err(Error::Assembly(format!(
                "frame {} is {}x{}, expected {}x{}",
                i,
                frame.width(),
                frame.height(),
                dims.0,
                dims.1
            )));
        }

        Ok(Self { frames })
    }

    pub fn frames(&self) -> &[QuantizedFrame] {
        &self.frames
    }

    pub fn len(&self) -> usize {
        self.frames.len()
    }

    /// Always false; an empty sequence cannot be constructed
    pub fn is_empty(&self) -> bool {
        self.frames.is_empty()
    }

    /// Shared frame dimensions
    pub fn dimensions(&self) -> (u32, u32) {
        self.frames[0].dimensions()
    }
}

/// Fully assembled animation
#[derive(Clone, PartialEq, Eq)]
pub struct EncodedStream {
    data: Bytes,
    file_name: String,
}

impl EncodedStream {
    /// Wrap encoded bytes, suggesting a `<unix-millis>.gif` file name
    pub fn new(data: impl Into<Bytes>) -> Self {
        let file_name = format!("{}.gif", chrono::Utc::now().timestamp_millis());
        Self::with_file_name(data, file_name)
    }

    pub fn with_file_name(data: impl Into<Bytes>, file_name: impl Into<String>) -> Self {
        Self {
            data: data.into(),
            file_name: file_name.into(),
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.data
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Suggested file name for persisting the stream
    pub fn file_name(&self) -> &str {
        &self.file_name
    }

    pub fn into_bytes(self) -> Bytes {
        self.data
    }
}

impl std::fmt::Debug for EncodedStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EncodedStream")
            .field("file_name", &self.file_name)
            .field("size", &self.data.len())
            .finish()
    }
}

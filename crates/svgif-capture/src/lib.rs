//! svgif capture - Timed snapshot sampling
//!
//! This crate provides:
//! - the [`SnapshotProvider`] abstraction over anything that can be rasterized
//! - a drift-corrected [`Sampler`] that captures at scheduled offsets
//! - [`SvgSource`], a provider backed by resvg

pub mod cancel;
pub mod sampler;
pub mod svg_source;

pub use cancel::CancelHandle;
pub use sampler::{Sampler, DEFAULT_CAPTURE_TIMEOUT};
pub use svg_source::{SourceSize, SvgSource};

// Re-export RasterFrame from svgif-core for convenience
pub use svgif_core::RasterFrame;

use std::time::Duration;
use svgif_core::Result;

/// Something that can report its current visual state as a raster
#[allow(async_fn_in_trait)]
pub trait SnapshotProvider {
    /// Capture a single frame
    ///
    /// `elapsed` is the offset from sampling start at which the capture fires.
    async fn capture(&mut self, elapsed: Duration) -> Result<RasterFrame>;

    /// Get the capture dimensions
    fn dimensions(&self) -> (u32, u32);
}

//! Sample-then-encode pipeline

use crate::gif::{GifMuxer, Repeat};
use crate::quantize::FrameQuantizer;
use svgif_capture::{CancelHandle, Sampler, SnapshotProvider};
use svgif_core::{Config, EncodedStream, FrameSequence, RasterFrame, Result, MAX_PALETTE_LEN};
use tracing::info;

/// Encoder settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncoderConfig {
    /// Maximum palette size per frame
    pub max_colors: usize,
    /// Loop behavior of the output
    pub repeat: Repeat,
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            max_colors: MAX_PALETTE_LEN,
            repeat: Repeat::Infinite,
        }
    }
}

impl From<&Config> for EncoderConfig {
    fn from(config: &Config) -> Self {
        Self {
            max_colors: config.max_colors as usize,
            repeat: Repeat::from_loop_count(config.loop_count),
        }
    }
}

/// Quantizes captured frames and muxes them into one GIF
#[derive(Debug, Clone)]
pub struct EncodingPipeline {
    quantizer: FrameQuantizer,
    muxer: GifMuxer,
}

impl EncodingPipeline {
    /// Create a new encoding pipeline
    pub fn new(config: EncoderConfig) -> Result<Self> {
        Ok(Self {
            quantizer: FrameQuantizer::new(config.max_colors)?,
            muxer: GifMuxer::new().with_repeat(config.repeat),
        })
    }

    /// Quantize every frame in capture order
    ///
    /// The first failing frame aborts the batch.
    pub fn quantize_all(&self, frames: Vec<RasterFrame>, delay_cs: u16) -> Result<FrameSequence> {
        let quantized = frames
            .into_iter()
            .map(|frame| self.quantizer.quantize(frame, delay_cs))
            .collect::<Result<Vec<_>>>()?;
        FrameSequence::new(quantized)
    }

    /// Quantize and assemble a complete, ordered capture
    pub fn encode(&self, frames: Vec<RasterFrame>, delay_cs: u16) -> Result<EncodedStream> {
        let sequence = self.quantize_all(frames, delay_cs)?;
        let stream = self.muxer.assemble(&sequence)?;

        info!(
            "Encoded {} frame(s) into {} bytes ({})",
            sequence.len(),
            stream.len(),
            stream.file_name()
        );

        Ok(stream)
    }

    /// Run the sampler to completion, then encode what it captured
    ///
    /// Nothing is encoded unless every capture succeeded.
    pub async fn record<P: SnapshotProvider>(
        &self,
        sampler: &Sampler,
        provider: &mut P,
        cancel: &CancelHandle,
    ) -> Result<EncodedStream> {
        let frames = sampler.run(provider, cancel).await?;
        self.encode(frames, sampler.plan().frame_delay_cs())
    }
}

//! svgif Encoder - palette quantization and GIF assembly
//!
//! This crate turns captured RGBA frames into a single animated GIF89a
//! stream. Nothing here depends on an external GIF library.

pub mod gif;
pub mod lzw;
pub mod pipeline;
pub mod quantize;

pub use gif::{GifMuxer, Repeat};
pub use pipeline::{EncoderConfig, EncodingPipeline};
pub use quantize::FrameQuantizer;

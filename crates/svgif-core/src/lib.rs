//! svgif core - Shared frame types, sampling plan and configuration
//!
//! This crate provides the foundational types used across all svgif components.

pub mod config;
pub mod error;
pub mod frame;
pub mod plan;

pub use config::Config;
pub use error::{Error, ErrorKind, Result};
pub use frame::{EncodedStream, FrameSequence, QuantizedFrame, RasterFrame, Rgb, MAX_PALETTE_LEN};
pub use plan::SamplingPlan;

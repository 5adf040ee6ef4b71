//! Configuration types for svgif

use crate::{Error, Result, SamplingPlan};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for a conversion run
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct Config {
    /// Output width in pixels (conflicts with `original`)
    pub width: Option<u32>,
    /// Output height in pixels (conflicts with `original`)
    pub height: Option<u32>,
    /// Render the source at its natural size
    pub original: bool,
    /// Offset of the first capture in milliseconds
    pub begin_ms: u64,
    /// Time between captures in milliseconds
    pub interval_ms: u64,
    /// End of the capture window in milliseconds
    pub duration_ms: u64,
    /// Maximum palette size per frame
    pub max_colors: u16,
    /// Number of times the animation repeats (0 = forever)
    pub loop_count: u16,
    /// Grace period for a single capture in milliseconds
    pub capture_timeout_ms: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            width: None,
            height: None,
            original: true,
            begin_ms: 0,
            interval_ms: 100,
            duration_ms: 1000,
            max_colors: 256,
            loop_count: 0,
            capture_timeout_ms: 5000,
        }
    }
}

impl Config {
    /// Create a new configuration with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let text = std::fs::read_to_string(path.as_ref())?;
        let config: Config = serde_json::from_str(&text)?;
        tracing::debug!("Loaded configuration from {}", path.as_ref().display());
        Ok(config)
    }

    /// Builder pattern: set width
    pub fn with_width(mut self, width: u32) -> Self {
        self.width = Some(width);
        self.original = false;
        self
    }

    /// Builder pattern: set height
    pub fn with_height(mut self, height: u32) -> Self {
        self.height = Some(height);
        self.original = false;
        self
    }

    /// Builder pattern: render at the source's natural size
    pub fn with_original(mut self, original: bool) -> Self {
        self.original = original;
        self
    }

    /// Builder pattern: set begin offset
    pub fn with_begin_ms(mut self, begin_ms: u64) -> Self {
        self.begin_ms = begin_ms;
        self
    }

    /// Builder pattern: set capture interval
    pub fn with_interval_ms(mut self, interval_ms: u64) -> Self {
        self.interval_ms = interval_ms;
        self
    }

    /// Builder pattern: set capture window end
    pub fn with_duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = duration_ms;
        self
    }

    /// Builder pattern: set maximum palette size
    pub fn with_max_colors(mut self, max_colors: u16) -> Self {
        self.max_colors = max_colors;
        self
    }

    /// Builder pattern: set loop count
    pub fn with_loop_count(mut self, loop_count: u16) -> Self {
        self.loop_count = loop_count;
        self
    }

    /// Builder pattern: set capture timeout
    pub fn with_capture_timeout_ms(mut self, capture_timeout_ms: u64) -> Self {
        self.capture_timeout_ms = capture_timeout_ms;
        self
    }

    /// Check the fields that do not belong to the sampling plan
    pub fn validate(&self) -> Result<()> {
        if !self.original && self.width.is_none() && self.height.is_none() {
            return Err(Error::Config(
                "either a width, a height or the original size is required".into(),
            ));
        }
        if self.original && (self.width.is_some() || self.height.is_some()) {
            return Err(Error::Config(
                "original size conflicts with an explicit width/height; set \"original\" to false"
                    .into(),
            ));
        }
        if self.width == Some(0) || self.height == Some(0) {
            return Err(Error::Config("width and height must be positive".into()));
        }
        if !(2..=256).contains(&self.max_colors) {
            return Err(Error::Config(format!(
                "max_colors must be between 2 and 256, got {}",
                self.max_colors
            )));
        }
        if self.capture_timeout_ms == 0 {
            return Err(Error::Config("capture timeout must be positive".into()));
        }
        Ok(())
    }

    /// Build the sampling plan described by this configuration
    pub fn plan(&self) -> Result<SamplingPlan> {
        SamplingPlan::from_millis(self.begin_ms, self.interval_ms, self.duration_ms)
    }

    /// Requested output size, `None` when rendering at natural size
    pub fn size_override(&self) -> Option<(Option<u32>, Option<u32>)> {
        if self.original {
            None
        } else {
            Some((self.width, self.height))
        }
    }

    pub fn capture_timeout(&self) -> Duration {
        Duration::from_millis(self.capture_timeout_ms)
    }
}

//! SVG snapshot source rendered with resvg

use crate::SnapshotProvider;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use svgif_core::{Error, RasterFrame, Result};
use tracing::{debug, info};

/// Largest raster side we are willing to allocate
const MAX_DIM: u32 = 16_384;

/// How large to rasterize the source
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SourceSize {
    /// Use the document's intrinsic size
    #[default]
    Natural,
    /// Explicit size; a missing side keeps the document's aspect ratio
    Fixed {
        width: Option<u32>,
        height: Option<u32>,
    },
}

impl SourceSize {
    /// Build from an optional `(width, height)` override
    pub fn from_override(size: Option<(Option<u32>, Option<u32>)>) -> Self {
        match size {
            Some((width, height)) => SourceSize::Fixed { width, height },
            None => SourceSize::Natural,
        }
    }

    fn resolve(self, natural_width: f32, natural_height: f32) -> Result<(u32, u32)> {
        fn to_px(v: f32) -> Result<u32> {
            if !v.is_finite() || v <= 0.0 {
                return Err(Error::Source("svg has invalid width/height".into()));
            }
            Ok((v.round() as u32).max(1))
        }

        let (width, height) = match self {
            SourceSize::Natural | SourceSize::Fixed { width: None, height: None } => {
                (to_px(natural_width)?, to_px(natural_height)?)
            }
            SourceSize::Fixed {
                width: Some(w),
                height: Some(h),
            } => (w, h),
            SourceSize::Fixed {
                width: Some(w),
                height: None,
            } => (w, to_px(w as f32 * natural_height / natural_width)?),
            SourceSize::Fixed {
                width: None,
                height: Some(h),
            } => (to_px(h as f32 * natural_width / natural_height)?, h),
        };

        if width == 0 || height == 0 {
            return Err(Error::Source(format!("svg raster size {width}x{height} is empty")));
        }
        if width > MAX_DIM || height > MAX_DIM {
            return Err(Error::Source(format!(
                "svg raster size too large: {width}x{height} (max {MAX_DIM}x{MAX_DIM})"
            )));
        }

        Ok((width, height))
    }
}

/// Rasterizes a parsed SVG document on every capture
///
/// resvg draws the document's static state only. SMIL and CSS animations are
/// not evaluated, so every capture yields the same image regardless of
/// `elapsed`. Providers that can seek in time should implement
/// [`SnapshotProvider`] themselves.
pub struct SvgSource {
    tree: usvg::Tree,
    width: u32,
    height: u32,
}

impl SvgSource {
    /// Parse an SVG document from memory
    pub fn from_data(data: &[u8], size: SourceSize) -> Result<Self> {
        Self::parse(data, None, size)
    }

    /// Load an SVG document from disk; relative references resolve next to it
    pub fn from_file(path: impl AsRef<Path>, size: SourceSize) -> Result<Self> {
        let path = path.as_ref();
        let data = std::fs::read(path)?;
        let source = Self::parse(&data, path.parent(), size)?;
        info!(
            "Loaded {} ({}x{})",
            path.display(),
            source.width,
            source.height
        );
        Ok(source)
    }

    fn parse(data: &[u8], resources_dir: Option<&Path>, size: SourceSize) -> Result<Self> {
        let mut fontdb = usvg::fontdb::Database::new();
        fontdb.load_system_fonts();

        let opts = usvg::Options {
            resources_dir: resources_dir.map(Path::to_path_buf),
            fontdb: Arc::new(fontdb),
            ..Default::default()
        };

        let tree = usvg::Tree::from_data(data, &opts)
            .map_err(|e| Error::Source(format!("parse svg tree: {e}")))?;
        let natural = tree.size();
        let (width, height) = size.resolve(natural.width(), natural.height())?;

        debug!(
            "SVG natural size {}x{}, raster size {}x{}",
            natural.width(),
            natural.height(),
            width,
            height
        );

        Ok(Self {
            tree,
            width,
            height,
        })
    }

    /// Render the document into a straight-alpha RGBA frame
    pub fn render(&self) -> Result<RasterFrame> {
        let mut pixmap = resvg::tiny_skia::Pixmap::new(self.width, self.height)
            .ok_or_else(|| Error::Source("failed to allocate svg pixmap".into()))?;

        let size = self.tree.size();
        let sx = self.width as f32 / size.width();
        let sy = self.height as f32 / size.height();
        let xform = resvg::tiny_skia::Transform::from_scale(sx, sy);

        resvg::render(&self.tree, xform, &mut pixmap.as_mut());

        // tiny-skia stores premultiplied color
        let data = pixmap
            .pixels()
            .iter()
            .flat_map(|px| {
                let c = px.demultiply();
                [c.red(), c.green(), c.blue(), c.alpha()]
            })
            .collect();

        RasterFrame::new(data, self.width, self.height)
    }
}

impl SnapshotProvider for SvgSource {
    async fn capture(&mut self, _elapsed: Duration) -> Result<RasterFrame> {
        self.render()
    }

    fn dimensions(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

impl std::fmt::Debug for SvgSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SvgSource")
            .field("width", &self.width)
            .field("height", &self.height)
            .finish()
    }
}

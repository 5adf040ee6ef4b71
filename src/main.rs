//! svgif - render an SVG at a fixed cadence and save it as an animated GIF
//!
//! Captures are scheduled against the ideal timeline so slow renders do not
//! accumulate drift. Every frame is quantized to its own palette and the
//! sequence is written as one self-contained GIF89a file.

use anyhow::{Context, Result};
use clap::Parser;
use std::path::PathBuf;
use svgif_capture::{CancelHandle, Sampler, SourceSize, SvgSource};
use svgif_core::{Config, Error};
use svgif_encoder::{EncoderConfig, EncodingPipeline};
use tracing::{debug, info, warn, Level};
use tracing_subscriber::EnvFilter;

/// svgif - Sample an SVG at a fixed cadence into a GIF
#[derive(Parser, Debug)]
#[command(name = "svgif")]
#[command(version, about, long_about = None)]
struct Args {
    /// SVG document to capture
    source: PathBuf,

    /// Output width in pixels
    #[arg(short = 'W', long)]
    width: Option<u32>,

    /// Output height in pixels
    #[arg(short = 'H', long)]
    height: Option<u32>,

    /// Render at the document's own size
    #[arg(long)]
    original: bool,

    /// Offset of the first capture in milliseconds
    #[arg(short, long)]
    begin: Option<u64>,

    /// Time between captures in milliseconds
    #[arg(short, long)]
    interval: Option<u64>,

    /// End of the capture window in milliseconds
    #[arg(short, long, required_unless_present = "config")]
    duration: Option<u64>,

    /// Output file (default: <unix-millis>.gif)
    #[arg(short, long)]
    output: Option<PathBuf>,

    /// Maximum palette size per frame (2-256)
    #[arg(long)]
    colors: Option<u16>,

    /// Number of loops, 0 loops forever
    #[arg(long)]
    loop_count: Option<u16>,

    /// Grace period for a single capture in milliseconds
    #[arg(long)]
    capture_timeout_ms: Option<u64>,

    /// JSON configuration file; flags override its values
    #[arg(long)]
    config: Option<PathBuf>,

    /// Verbose logging
    #[arg(short, long)]
    verbose: bool,
}

/// Merge the optional config file with command line overrides
fn build_config(args: &Args) -> Result<Config> {
    // Without a file, a size or --original has to be given explicitly
    let mut config = match &args.config {
        Some(path) => Config::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => Config::new().with_original(false),
    };

    if let Some(width) = args.width {
        config = config.with_width(width);
    }
    if let Some(height) = args.height {
        config = config.with_height(height);
    }
    if args.original {
        config = config.with_original(true);
    }
    if let Some(begin) = args.begin {
        config = config.with_begin_ms(begin);
    }
    if let Some(interval) = args.interval {
        config = config.with_interval_ms(interval);
    }
    if let Some(duration) = args.duration {
        config = config.with_duration_ms(duration);
    }
    if let Some(colors) = args.colors {
        config = config.with_max_colors(colors);
    }
    if let Some(loop_count) = args.loop_count {
        config = config.with_loop_count(loop_count);
    }
    if let Some(timeout) = args.capture_timeout_ms {
        config = config.with_capture_timeout_ms(timeout);
    }

    config.validate()?;
    Ok(config)
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    let log_level = if args.verbose { Level::DEBUG } else { Level::INFO };
    let subscriber = tracing_subscriber::fmt()
        .with_max_level(log_level)
        .with_target(false)
        .compact()
        .with_env_filter(EnvFilter::from_default_env().add_directive(log_level.into()))
        .finish();
    tracing::subscriber::set_global_default(subscriber).ok();

    info!("svgif v{}", env!("CARGO_PKG_VERSION"));

    let config = build_config(&args)?;
    let plan = config.plan()?;
    debug!("Configuration: {:?}", config);

    let size = SourceSize::from_override(config.size_override());
    let mut source = SvgSource::from_file(&args.source, size)
        .with_context(|| format!("failed to load {}", args.source.display()))?;

    if plan.capture_count() > 1 {
        warn!(
            "SVG animations are not evaluated; all {} frames will show the document's static state",
            plan.capture_count()
        );
    }

    let sampler = Sampler::new(plan).with_capture_timeout(config.capture_timeout());
    let pipeline = EncodingPipeline::new(EncoderConfig::from(&config))?;

    info!(
        "Capturing {} frame(s) every {:?} starting at {:?}",
        plan.capture_count(),
        plan.interval(),
        plan.begin()
    );

    let cancel = CancelHandle::new();
    let shutdown = cancel.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("Shutting down...");
        shutdown.cancel();
    });

    let stream = match pipeline.record(&sampler, &mut source, &cancel).await {
        Ok(stream) => stream,
        Err(Error::Cancelled) => {
            warn!("Capture cancelled, no output written");
            return Ok(());
        }
        Err(e) => return Err(e.into()),
    };

    let output = args
        .output
        .clone()
        .unwrap_or_else(|| PathBuf::from(stream.file_name()));
    tokio::fs::write(&output, stream.as_bytes())
        .await
        .with_context(|| format!("failed to write {}", output.display()))?;

    info!("Wrote {} ({} bytes)", output.display(), stream.len());
    Ok(())
}

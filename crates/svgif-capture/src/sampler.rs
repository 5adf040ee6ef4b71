//! Drift-corrected frame sampler
//!
//! Capture targets advance additively from the previous *target*, never from
//! the actual fire time, so a late tick shortens the following sleep instead
//! of pushing every later capture back.

use crate::{CancelHandle, SnapshotProvider};
use std::future::Future;
use std::time::Duration;
use svgif_core::{Error, RasterFrame, Result, SamplingPlan};
use tokio::time::{sleep, timeout, Instant};
use tracing::{debug, info};

/// Default grace period for one capture
pub const DEFAULT_CAPTURE_TIMEOUT: Duration = Duration::from_secs(5);

/// Executes a [`SamplingPlan`] against a snapshot provider
#[derive(Debug, Clone)]
pub struct Sampler {
    plan: SamplingPlan,
    capture_timeout: Duration,
}

impl Sampler {
    /// Create a sampler for the given plan
    pub fn new(plan: SamplingPlan) -> Self {
        Self {
            plan,
            capture_timeout: DEFAULT_CAPTURE_TIMEOUT,
        }
    }

    /// Builder pattern: set the per-capture grace period
    pub fn with_capture_timeout(mut self, capture_timeout: Duration) -> Self {
        self.capture_timeout = capture_timeout;
        self
    }

    pub fn plan(&self) -> &SamplingPlan {
        &self.plan
    }

    /// Capture every frame of the plan, in order
    ///
    /// Fails on the first capture error or timeout, and returns
    /// [`Error::Cancelled`] if `cancel` fires first. No partial frames are
    /// returned in either case.
    pub async fn run<P: SnapshotProvider>(
        &self,
        provider: &mut P,
        cancel: &CancelHandle,
    ) -> Result<Vec<RasterFrame>> {
        let total = self.plan.capture_count();
        let interval = self.plan.interval();

        info!(
            "Sampling {} frame(s): begin {} ms, interval {} ms",
            total,
            self.plan.begin().as_millis(),
            interval.as_millis()
        );

        let start = Instant::now();
        let mut target = self.plan.begin();
        let mut frames = Vec::with_capacity(total.min(1024) as usize);

        until_cancelled(cancel, sleep(target)).await?;

        loop {
            let index = frames.len();
            let fired_at = start.elapsed();
            let frame = self.capture_one(provider, index, fired_at, cancel).await?;

            debug!(
                "Captured frame {}: target {:?}, actual {:?}",
                index, target, fired_at
            );
            frames.push(frame.stamped(index as u64, fired_at));

            if frames.len() as u64 >= total {
                break;
            }

            let drift = start.elapsed().saturating_sub(target);
            target += interval;
            until_cancelled(cancel, sleep(interval.saturating_sub(drift))).await?;
        }

        info!(
            "Sampling finished: {} frame(s) in {:?}",
            frames.len(),
            start.elapsed()
        );

        Ok(frames)
    }

    async fn capture_one<P: SnapshotProvider>(
        &self,
        provider: &mut P,
        index: usize,
        elapsed: Duration,
        cancel: &CancelHandle,
    ) -> Result<RasterFrame> {
        let attempt = timeout(self.capture_timeout, provider.capture(elapsed));
        match until_cancelled(cancel, attempt).await? {
            Ok(Ok(frame)) => Ok(frame),
            Ok(Err(e)) => Err(Error::capture(index, e.to_string())),
            Err(_) => Err(Error::capture_timeout(index, self.capture_timeout)),
        }
    }
}

/// Drive `fut` unless cancellation is requested first
async fn until_cancelled<F: Future>(cancel: &CancelHandle, fut: F) -> Result<F::Output> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(Error::Cancelled),
        output = fut => Ok(output),
    }
}

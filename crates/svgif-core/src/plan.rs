//! Sampling schedule

use crate::{Error, Result};
use std::time::Duration;

/// When to take snapshots of the source
///
/// The first capture happens at `begin`, then one more every `interval` for
/// as long as the next offset stays within `duration`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SamplingPlan {
    begin: Duration,
    interval: Duration,
    duration: Duration,
}

impl SamplingPlan {
    /// Create a plan, rejecting a zero interval or a duration before `begin`
    pub fn new(begin: Duration, interval: Duration, duration: Duration) -> Result<Self> {
        if interval.is_zero() {
            return Err(Error::InvalidPlan("interval must be greater than zero".into()));
        }
        if duration < begin {
            return Err(Error::InvalidPlan(format!(
                "duration {} ms is before begin {} ms",
                duration.as_millis(),
                begin.as_millis()
            )));
        }

        Ok(Self {
            begin,
            interval,
            duration,
        })
    }

    /// Create a plan from millisecond values
    pub fn from_millis(begin: u64, interval: u64, duration: u64) -> Result<Self> {
        Self::new(
            Duration::from_millis(begin),
            Duration::from_millis(interval),
            Duration::from_millis(duration),
        )
    }

    pub fn begin(&self) -> Duration {
        self.begin
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Number of captures after the first one
    pub fn repeat_count(&self) -> u64 {
        let span = (self.duration - self.begin).as_nanos();
        (span / self.interval.as_nanos()) as u64
    }

    /// Total number of captures, always at least one
    pub fn capture_count(&self) -> u64 {
        self.repeat_count() + 1
    }

    /// Scheduled offset of capture `index`
    pub fn target_offset(&self, index: u64) -> Duration {
        let steps = u32::try_from(index).unwrap_or(u32::MAX);
        self.begin.saturating_add(self.interval.saturating_mul(steps))
    }

    /// Interval in centiseconds, rounded to nearest and at least 1
    pub fn frame_delay_cs(&self) -> u16 {
        let cs = (self.interval.as_micros() + 5_000) / 10_000;
        cs.clamp(1, u16::MAX as u128) as u16
    }
}

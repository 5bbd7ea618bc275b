//! Lap timing and trimmed statistics.
//!
//! Laps are sorted and only the ones ranked inside the trim window are kept:
//! with `len` samples the kept ranks are `floor(len * lower)` (inclusive) up to
//! `floor(len * upper)` (exclusive). If that range is empty every sample is
//! kept. For the default 20 laps and a 0.2..0.8 window this keeps ranks 4..16.

use std::{
    ops::Range,
    time::{Duration, Instant},
};

use crate::error::BenchError;

/// Percentile window (as fractions) the statistics are computed over.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimWindow {
    lower: f64,
    upper: f64,
}

impl Default for TrimWindow {
    fn default() -> Self {
        Self { lower: 0.2, upper: 0.8 }
    }
}

impl TrimWindow {
    pub fn new(lower: f64, upper: f64) -> Result<Self, BenchError> {
        if !(0.0..1.0).contains(&lower) || !(lower < upper && upper <= 1.0) {
            return Err(BenchError::Config(format!(
                "trim window must satisfy 0 <= lower < upper <= 1, got {lower}..{upper}"
            )));
        }
        Ok(Self { lower, upper })
    }

    /// Everything, no trimming.
    pub fn full() -> Self {
        Self { lower: 0.0, upper: 1.0 }
    }

    pub fn lower(&self) -> f64 {
        self.lower
    }

    pub fn upper(&self) -> f64 {
        self.upper
    }

    /// Ranks kept out of `len` sorted samples.
    pub fn bounds(&self, len: usize) -> Range<usize> {
        let from = (len as f64 * self.lower).floor() as usize;
        let to = ((len as f64 * self.upper).floor() as usize).min(len);
        if to <= from { 0..len } else { from..to }
    }
}

/// Mean and population standard deviation in seconds.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrimmedStats {
    pub mean: f64,
    pub std: f64,
    /// Samples that survived trimming.
    pub kept: usize,
    pub total: usize,
}

impl TrimmedStats {
    pub fn compute(laps: &[Duration], window: TrimWindow) -> Self {
        let mut secs: Vec<f64> = laps.iter().map(Duration::as_secs_f64).collect();
        secs.sort_by(f64::total_cmp);

        let kept = &secs[window.bounds(secs.len())];
        if kept.is_empty() {
            return Self { mean: 0.0, std: 0.0, kept: 0, total: 0 };
        }
        let count = kept.len() as f64;
        let mean = kept.iter().sum::<f64>() / count;
        let var = kept.iter().map(|s| (s - mean) * (s - mean)).sum::<f64>() / count;

        Self { mean, std: var.sqrt(), kept: kept.len(), total: secs.len() }
    }

    /// `units` per second of mean lap time, divided by `scale`.
    pub fn rate(&self, units: f64, scale: f64) -> f64 {
        units / self.mean / scale
    }
}

/// Stopwatch that measures consecutive laps from its creation.
pub struct LapTimer {
    last: Instant,
    laps: Vec<Duration>,
}

impl LapTimer {
    pub fn start(capacity: usize) -> Self {
        Self { last: Instant::now(), laps: Vec::with_capacity(capacity) }
    }

    /// Closes the current lap and starts the next one.
    pub fn next_lap(&mut self) -> Duration {
        let now = Instant::now();
        let lap = now - self.last;
        self.last = now;
        self.laps.push(lap);
        lap
    }

    pub fn laps(&self) -> &[Duration] {
        &self.laps
    }

    pub fn into_laps(self) -> Vec<Duration> {
        self.laps
    }
}

//! Running guide error statistics
//!
//! One [`StatAccumulator`] per axis lives inside the reader thread's
//! dispatcher. Callers only ever see [`GuideStats`], built from the
//! [`StatsSnapshot`] the dispatcher copies into shared state.

/// Online mean / population variance / peak tracker (Welford update).
#[derive(Debug, Clone, Default)]
pub struct StatAccumulator {
    count: u64,
    mean: f64,
    sumsq: f64,
    peak: f64,
}

impl StatAccumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn add(&mut self, x: f64) {
        let ax = x.abs();
        if ax > self.peak {
            self.peak = ax;
        }

        self.count += 1;
        let delta = x - self.mean;
        self.mean += delta / self.count as f64;
        self.sumsq += (x - self.mean) * delta;
    }

    pub fn count(&self) -> u64 {
        self.count
    }

    pub fn mean(&self) -> f64 {
        self.mean
    }

    /// Population standard deviation; 0 with no samples.
    pub fn stdev(&self) -> f64 {
        if self.count >= 1 {
            (self.sumsq / self.count as f64).sqrt()
        } else {
            0.0
        }
    }

    /// Largest absolute sample seen since the last reset
    pub fn peak(&self) -> f64 {
        self.peak
    }
}

/// Per-axis figures copied out of the accumulators
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct StatsSnapshot {
    pub rms_ra: f64,
    pub rms_dec: f64,
    pub peak_ra: f64,
    pub peak_dec: f64,
}

impl StatsSnapshot {
    pub fn from_accumulators(ra: &StatAccumulator, dec: &StatAccumulator) -> Self {
        Self {
            rms_ra: ra.stdev(),
            rms_dec: dec.stdev(),
            peak_ra: ra.peak(),
            peak_dec: dec.peak(),
        }
    }
}

/// Guide error statistics since guiding or settling last completed (pixels)
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct GuideStats {
    pub rms_tot: f64,
    pub rms_ra: f64,
    pub rms_dec: f64,
    pub peak_ra: f64,
    pub peak_dec: f64,
}

impl From<StatsSnapshot> for GuideStats {
    fn from(s: StatsSnapshot) -> Self {
        Self {
            rms_tot: s.rms_ra.hypot(s.rms_dec),
            rms_ra: s.rms_ra,
            rms_dec: s.rms_dec,
            peak_ra: s.peak_ra,
            peak_dec: s.peak_dec,
        }
    }
}

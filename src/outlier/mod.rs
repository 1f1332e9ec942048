// Z-score outlier filter
//
// Gates admission into a full rolling window. Never consulted during warm-up.

use crate::window::RollingWindow;

/// Default |z| above which a candidate is discarded
pub const DEFAULT_OUTLIER_Z_THRESHOLD: f64 = 3.0;

/// Z-score test against the current contents of a window.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct OutlierFilter {
    z_threshold: f64,
}

impl OutlierFilter {
    pub fn new(z_threshold: f64) -> Self {
        Self { z_threshold }
    }

    pub fn z_threshold(&self) -> f64 {
        self.z_threshold
    }

    /// Z-score of `candidate` relative to `window`.
    ///
    /// `None` when the score is undefined: statistics unavailable (fewer than
    /// two samples) or zero variance.
    pub fn z_score(window: &RollingWindow, candidate: f64) -> Option<f64> {
        let mean = window.mean()?;
        let stddev = window.stddev()?;
        if stddev == 0.0 {
            return None;
        }
        Some((candidate - mean) / stddev)
    }

    /// True iff `|z| > z_threshold`.
    ///
    /// An undefined Z-score is never an outlier: a window of identical
    /// samples accepts any candidate.
    pub fn is_outlier(&self, window: &RollingWindow, candidate: f64) -> bool {
        match Self::z_score(window, candidate) {
            Some(z) => z.abs() > self.z_threshold,
            None => false,
        }
    }
}

impl Default for OutlierFilter {
    fn default() -> Self {
        Self::new(DEFAULT_OUTLIER_Z_THRESHOLD)
    }
}

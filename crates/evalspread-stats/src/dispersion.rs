//! Dispersion metrics over a set of engine scores.
//!
//! Percentiles (and therefore medians and the IQR) use linear interpolation
//! between closest ranks: for sorted values `x[0..n]` and fraction `p`, the
//! rank is `h = p * (n - 1)` and the result is
//! `x[floor(h)] + (h - floor(h)) * (x[floor(h) + 1] - x[floor(h)])`.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

// ---------------------------------------------------------------------------
// Metric names
// ---------------------------------------------------------------------------

/// One of the four spread metrics, in the order the detector reports them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Metric {
    /// max - min. Labelled "Variance" in results files for compatibility.
    Range,
    /// Interquartile range (P75 - P25).
    Iqr,
    /// Population standard deviation.
    StdDev,
    /// Median absolute deviation from the median.
    Mad,
}

impl Metric {
    pub const ALL: [Metric; 4] = [Metric::Range, Metric::Iqr, Metric::StdDev, Metric::Mad];

    /// Column header used in results files.
    pub fn column(self) -> &'static str {
        match self {
            Self::Range => "Variance",
            Self::Iqr => "IQR",
            Self::StdDev => "Standard Deviation",
            Self::Mad => "MAD",
        }
    }

    /// Short label used in critical-point and chart file names.
    pub fn label(self) -> &'static str {
        match self {
            Self::Range => "Variance",
            Self::Iqr => "IQR",
            Self::StdDev => "SD",
            Self::Mad => "MAD",
        }
    }
}

impl std::fmt::Display for Metric {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Range => write!(f, "range"),
            Self::Iqr => write!(f, "iqr"),
            Self::StdDev => write!(f, "std_dev"),
            Self::Mad => write!(f, "mad"),
        }
    }
}

// ---------------------------------------------------------------------------
// Result type
// ---------------------------------------------------------------------------

/// The four spread metrics of one score set.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Dispersion {
    pub range: f64,
    pub std_dev: f64,
    pub mad: f64,
    pub iqr: f64,
}

impl Dispersion {
    pub fn get(&self, metric: Metric) -> f64 {
        match metric {
            Metric::Range => self.range,
            Metric::Iqr => self.iqr,
            Metric::StdDev => self.std_dev,
            Metric::Mad => self.mad,
        }
    }
}

// ---------------------------------------------------------------------------
// Computation
// ---------------------------------------------------------------------------

/// Compute all four metrics from the same score set.
///
/// Returns `None` for an empty set; callers skip such positions instead of
/// reporting zeros.
pub fn compute(scores: &[i32]) -> Option<Dispersion> {
    if scores.is_empty() {
        return None;
    }

    let mut sorted: Vec<f64> = scores.iter().map(|&s| s as f64).collect();
    sorted.sort_by(f64::total_cmp);

    let range = sorted[sorted.len() - 1] - sorted[0];
    let std_dev = Statistics::population_std_dev(sorted.iter());

    let median = percentile_sorted(&sorted, 0.5);
    let mut deviations: Vec<f64> = sorted.iter().map(|x| (x - median).abs()).collect();
    deviations.sort_by(f64::total_cmp);
    let mad = percentile_sorted(&deviations, 0.5);

    let iqr = percentile_sorted(&sorted, 0.75) - percentile_sorted(&sorted, 0.25);

    Some(Dispersion {
        range,
        std_dev,
        mad,
        iqr,
    })
}

/// Percentile of ascending data with linear interpolation; `p` is in `[0, 1]`.
fn percentile_sorted(sorted: &[f64], p: f64) -> f64 {
    let n = sorted.len();
    if n == 1 {
        return sorted[0];
    }
    let h = p.clamp(0.0, 1.0) * (n - 1) as f64;
    let lower = h.floor() as usize;
    let upper = (lower + 1).min(n - 1);
    let frac = h - lower as f64;
    sorted[lower] + frac * (sorted[upper] - sorted[lower])
}

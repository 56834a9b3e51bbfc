//! Numeric core of evalspread.
//!
//! Two pure building blocks with no I/O:
//!
//! - [`dispersion`] reduces a set of per-move scores to four spread metrics
//!   (range, population standard deviation, median absolute deviation and
//!   interquartile range).
//! - [`critical`] scans an ordered metric sequence for critical dips: three
//!   strictly decreasing values whose points are not collinear.

pub mod critical;
pub mod dispersion;

pub use critical::{CriticalPoint, detect};
pub use dispersion::{Dispersion, Metric, compute};

//! Critical-point detection over an ordered metric sequence.
//!
//! A window of three consecutive values `(v1, v2, v3)` starting at index `i`
//! is critical when both hold:
//!
//! 1. `v2 < v1` and `v3 < v2` (two strictly decreasing steps);
//! 2. the points `(i+1, v1)`, `(i+2, v2)`, `(i+3, v3)` bend: the direct
//!    distance from the first to the third point is strictly shorter than the
//!    path through the middle one. Equality means the points are collinear.
//!
//! Every start index is evaluated independently, so overlapping windows may
//! both be reported.

use serde::{Deserialize, Serialize};

/// A flagged window of three consecutive sequence entries.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CriticalPoint {
    /// 0-based index of the first entry of the window.
    pub start: usize,
    pub values: [f64; 3],
}

impl CriticalPoint {
    /// 1-based positions of the three entries, as plotted and reported.
    pub fn positions(&self) -> [usize; 3] {
        [self.start + 1, self.start + 2, self.start + 3]
    }
}

/// Scan `sequence` and return all critical windows in ascending start order.
///
/// Sequences shorter than three entries yield an empty result.
pub fn detect(sequence: &[f64]) -> Vec<CriticalPoint> {
    sequence
        .windows(3)
        .enumerate()
        .filter(|(i, w)| is_descending(w) && is_bowed(*i, w))
        .map(|(i, w)| CriticalPoint {
            start: i,
            values: [w[0], w[1], w[2]],
        })
        .collect()
}

fn is_descending(w: &[f64]) -> bool {
    w[1] < w[0] && w[2] < w[1]
}

fn is_bowed(start: usize, w: &[f64]) -> bool {
    let p1 = ((start + 1) as f64, w[0]);
    let p2 = ((start + 2) as f64, w[1]);
    let p3 = ((start + 3) as f64, w[2]);
    distance(p1, p3) < distance(p1, p2) + distance(p2, p3)
}

/// Plain sqrt of squared deltas. Collinear equal steps then compare exactly
/// equal, since doubling both deltas scales the sum by an exact power of two.
fn distance(a: (f64, f64), b: (f64, f64)) -> f64 {
    let dx = b.0 - a.0;
    let dy = b.1 - a.1;
    (dx * dx + dy * dy).sqrt()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_sequences_are_empty() {
        assert!(detect(&[]).is_empty());
        assert!(detect(&[5.0]).is_empty());
        assert!(detect(&[5.0, 4.0]).is_empty());
    }

    #[test]
    fn test_collinear_descent_not_flagged() {
        assert!(detect(&[30.0, 20.0, 10.0]).is_empty());
    }

    #[test]
    fn test_collinear_bend_in_longer_sequence() {
        // Window 0 (100, 80, 60) has equal steps: the direct distance sqrt(1604)
        // equals 2 * sqrt(401). Window 1 rises, window 2 rises.
        assert!(detect(&[100.0, 80.0, 60.0, 90.0, 120.0]).is_empty());
    }

    #[test]
    fn test_bowed_descent_flagged() {
        let points = detect(&[100.0, 50.0, 40.0]);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].start, 0);
        assert_eq!(points[0].values, [100.0, 50.0, 40.0]);
        assert_eq!(points[0].positions(), [1, 2, 3]);
    }

    #[test]
    fn test_overlapping_windows_both_reported() {
        let points = detect(&[100.0, 50.0, 40.0, 35.0]);
        let starts: Vec<usize> = points.iter().map(|p| p.start).collect();
        assert_eq!(starts, vec![0, 1]);
    }

    #[test]
    fn test_flat_step_breaks_pattern() {
        assert!(detect(&[10.0, 10.0, 5.0]).is_empty());
        assert!(detect(&[10.0, 5.0, 5.0]).is_empty());
    }

    #[test]
    fn test_rising_middle_never_flagged() {
        for mid in [10.0, 11.0, 50.0] {
            assert!(detect(&[10.0, mid, 1.0]).is_empty(), "mid = {mid}");
        }
    }

    #[test]
    fn test_start_index_offsets_positions() {
        let seq = [1.0, 2.0, 90.0, 30.0, 25.0, 26.0];
        let points = detect(&seq);
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].start, 2);
        assert_eq!(points[0].positions(), [3, 4, 5]);
    }

    #[test]
    fn test_flagged_windows_are_strictly_descending() {
        // Deterministic pseudo-random walk.
        let mut state: u64 = 0x1234_5678_9ABC_DEF0;
        let seq: Vec<f64> = (0..500)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 40) % 200) as f64
            })
            .collect();
        let points = detect(&seq);
        assert!(!points.is_empty());
        for p in &points {
            let [v1, v2, v3] = p.values;
            assert!(v2 < v1 && v3 < v2, "window {} not descending", p.start);
            assert_eq!(&seq[p.start..p.start + 3], &p.values);
        }
        assert!(points.windows(2).all(|w| w[0].start < w[1].start));
    }

    #[test]
    fn test_detect_is_deterministic() {
        let seq = [9.0, 7.5, 3.0, 8.0, 4.0, 3.5, 0.0, 12.0];
        assert_eq!(detect(&seq), detect(&seq));
    }
}

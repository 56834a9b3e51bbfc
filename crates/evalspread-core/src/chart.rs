//! SVG line charts of a metric sequence with its critical points marked.

use std::collections::BTreeSet;
use std::error::Error;
use std::path::Path;

use evalspread_stats::{CriticalPoint, Metric};
use plotters::prelude::*;

use crate::error::ReportError;

const SIZE: (u32, u32) = (1000, 600);

/// Axis ranges for a sequence plotted at x = 1..=n. Empty and flat sequences
/// still get a non-degenerate frame.
fn frame(values: &[f64]) -> (std::ops::Range<f64>, std::ops::Range<f64>) {
    let (mut lo, mut hi) = values
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(*v), hi.max(*v)));
    if !lo.is_finite() || !hi.is_finite() {
        (lo, hi) = (0.0, 1.0);
    }
    if hi - lo < f64::EPSILON {
        lo -= 1.0;
        hi += 1.0;
    }
    let pad = (hi - lo) * 0.05;
    (1.0..values.len().max(2) as f64, lo - pad..hi + pad)
}

fn draw(
    svg: &mut String,
    metric: Metric,
    values: &[f64],
    points: &[CriticalPoint],
) -> Result<(), Box<dyn Error>> {
    let label = metric.label();
    let (x_range, y_range) = frame(values);

    let root = SVGBackend::with_string(svg, SIZE).into_drawing_area();
    root.fill(&WHITE)?;
    let mut chart = ChartBuilder::on(&root)
        .caption(format!("{label} and Critical Points"), ("sans-serif", 20))
        .margin(10)
        .x_label_area_size(40)
        .y_label_area_size(60)
        .build_cartesian_2d(x_range, y_range)?;

    chart
        .configure_mesh()
        .x_desc("Position")
        .y_desc(label)
        .x_labels(values.len().clamp(2, 10))
        .draw()?;

    let series = values.iter().enumerate().map(|(i, v)| ((i + 1) as f64, *v));
    chart
        .draw_series(LineSeries::new(series.clone(), BLUE))?
        .label(label)
        .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));
    chart.draw_series(series.map(|(x, y)| Circle::new((x, y), 3, BLUE.filled())))?;

    // Overlapping windows share entries; each entry is marked once.
    let marked: BTreeSet<usize> = points
        .iter()
        .flat_map(|p| p.start..p.start + 3)
        .filter(|i| *i < values.len())
        .collect();
    chart
        .draw_series(
            marked
                .into_iter()
                .map(|i| Circle::new(((i + 1) as f64, values[i]), 6, RED.filled())),
        )?
        .label("Critical Points")
        .legend(|(x, y)| Circle::new((x + 10, y), 5, RED.filled()));

    chart
        .configure_series_labels()
        .background_style(WHITE.mix(0.8))
        .border_style(BLACK)
        .draw()?;

    root.present()?;
    Ok(())
}

/// Render `values` (plotted at x = 1..=n) as an SVG document. Every entry of
/// every critical window gets a highlighted marker.
pub fn render_svg(
    metric: Metric,
    values: &[f64],
    points: &[CriticalPoint],
) -> Result<String, ReportError> {
    let mut svg = String::new();
    draw(&mut svg, metric, values, points).map_err(|e| ReportError::Chart(e.to_string()))?;
    Ok(svg)
}

pub fn write_chart(
    path: &Path,
    metric: Metric,
    values: &[f64],
    points: &[CriticalPoint],
) -> Result<(), ReportError> {
    let svg = render_svg(metric, values, points)?;
    std::fs::write(path, svg).map_err(|e| ReportError::io(path, e))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn circles(svg: &str) -> usize {
        svg.matches("<circle").count()
    }

    #[test]
    fn test_marks_every_point_of_each_window() {
        let values = [100.0, 50.0, 40.0, 35.0, 60.0];
        let points = evalspread_stats::detect(&values);
        assert_eq!(points.len(), 2);
        let marked = render_svg(Metric::Iqr, &values, &points).unwrap();
        let plain = render_svg(Metric::Iqr, &values, &[]).unwrap();
        // Windows 0..3 and 1..4 overlap: entries 0, 1, 2, 3 are marked once.
        assert_eq!(circles(&marked) - circles(&plain), 4);
        assert!(marked.contains("IQR and Critical Points"));
        assert!(marked.contains("Position"));
        assert!(marked.trim_end().ends_with("</svg>"));
    }

    #[test]
    fn test_empty_and_flat_sequences_render() {
        let empty = render_svg(Metric::Mad, &[], &[]).unwrap();
        assert!(!empty.contains("NaN"));
        let single = render_svg(Metric::Mad, &[7.0], &[]).unwrap();
        assert!(!single.contains("NaN"));
        assert!(!single.contains("inf"));
        let flat = render_svg(Metric::StdDev, &[3.0, 3.0, 3.0], &[]).unwrap();
        assert!(!flat.contains("NaN"));
        assert_eq!(circles(&flat) - circles(&empty), 3);
    }

    #[test]
    fn test_frame_pads_degenerate_ranges() {
        let (x, y) = frame(&[]);
        assert_eq!(x, 1.0..2.0);
        assert!(y.start < 0.0 && y.end > 1.0);
        let (x, y) = frame(&[5.0, 5.0, 5.0]);
        assert_eq!(x, 1.0..3.0);
        assert!(y.start < 4.0 && y.end > 6.0);
    }

    #[test]
    fn test_write_chart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("SD_graph.svg");
        write_chart(&path, Metric::StdDev, &[1.0, 2.0], &[]).unwrap();
        assert!(std::fs::read_to_string(&path).unwrap().starts_with("<svg"));
    }
}

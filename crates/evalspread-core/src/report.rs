//! Report files: dispersion results, critical points, run summaries.
//!
//! The results file doubles as the input of the detect stage. Rows are
//! `", "`-separated with a header line; the reader locates columns by their
//! trimmed header name.

use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use evalspread_stats::{CriticalPoint, Dispersion, Metric};
use log::warn;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::config::SearchSettings;
use crate::error::{InputError, ReportError};
use crate::pipeline::{BatchOutcome, DispersionRecord, MetricSequences};

pub const POSITION_COLUMN: &str = "Position Number";
pub const FEN_COLUMN: &str = "FEN";
const SEPARATOR: &str = ", ";

/// Header of the results file. "Variance" labels the range metric.
pub fn results_header() -> String {
    let mut columns = vec![POSITION_COLUMN, FEN_COLUMN];
    columns.extend(RESULT_METRICS.iter().map(|m| m.column()));
    columns.join(SEPARATOR)
}

/// Metric column order of the results file.
const RESULT_METRICS: [Metric; 4] = [Metric::Range, Metric::StdDev, Metric::Mad, Metric::Iqr];

/// Shortest decimal text that reads back to the same value.
pub fn format_value(v: f64) -> String {
    format!("{v:?}")
}

/// Results file cell. Range is a difference of integer scores and is
/// written without a fraction.
fn format_cell(metric: Metric, v: f64) -> String {
    match metric {
        Metric::Range if v.fract() == 0.0 => format!("{}", v as i64),
        _ => format_value(v),
    }
}

// ---------------------------------------------------------------------------
// Results file
// ---------------------------------------------------------------------------

pub fn format_results(records: &[DispersionRecord]) -> String {
    let mut out = results_header();
    out.push('\n');
    for r in records {
        out.push_str(&format_row(r));
        out.push('\n');
    }
    out
}

fn format_row(r: &DispersionRecord) -> String {
    let mut fields = vec![r.position.to_string(), r.fen.clone()];
    fields.extend(RESULT_METRICS.iter().map(|m| format_cell(*m, r.dispersion.get(*m))));
    fields.join(SEPARATOR)
}

pub fn write_results(path: &Path, records: &[DispersionRecord]) -> Result<(), ReportError> {
    let file = File::create(path).map_err(|e| ReportError::io(path, e))?;
    let mut w = BufWriter::new(file);
    w.write_all(format_results(records).as_bytes())
        .and_then(|_| w.flush())
        .map_err(|e| ReportError::io(path, e))
}

/// One row read back from a dispersion file.
#[derive(Debug, Clone, PartialEq)]
pub struct DispersionRow {
    pub position: usize,
    pub fen: Option<String>,
    pub dispersion: Dispersion,
}

/// Contents of a dispersion file.
#[derive(Debug, Default)]
pub struct DispersionTable {
    pub rows: Vec<DispersionRow>,
    /// Rows skipped for missing or unparsable fields.
    pub rejected: Vec<InputError>,
}

impl DispersionTable {
    pub fn sequences(&self) -> MetricSequences {
        let mut seq = MetricSequences::default();
        for row in &self.rows {
            seq.push(row.position, &row.dispersion);
        }
        seq
    }
}

struct Columns {
    position: usize,
    fen: Option<usize>,
    metrics: [(Metric, usize); 4],
}

impl Columns {
    fn locate(header: &str) -> Result<Self, InputError> {
        let names: Vec<&str> = header.split(',').map(str::trim).collect();
        let find = |name: &'static str| {
            names
                .iter()
                .position(|n| *n == name)
                .ok_or(InputError::MissingColumn(name))
        };
        let metric = |m: Metric| find(m.column()).map(|i| (m, i));
        Ok(Self {
            position: find(POSITION_COLUMN)?,
            fen: find(FEN_COLUMN).ok(),
            metrics: [
                metric(Metric::Range)?,
                metric(Metric::StdDev)?,
                metric(Metric::Mad)?,
                metric(Metric::Iqr)?,
            ],
        })
    }

    fn parse_row(&self, row: usize, line: &str) -> Result<DispersionRow, InputError> {
        let fields: Vec<&str> = line.split(',').map(str::trim).collect();
        let field = |index: usize, name: &'static str| {
            fields
                .get(index)
                .copied()
                .filter(|f| !f.is_empty())
                .ok_or(InputError::MissingField { row, field: name })
        };
        let invalid = |name: &'static str, value: &str| InputError::InvalidNumber {
            row,
            field: name,
            value: value.to_string(),
        };

        let raw = field(self.position, POSITION_COLUMN)?;
        let position = raw.parse::<usize>().map_err(|_| invalid(POSITION_COLUMN, raw))?;

        let mut values = [0.0; 4];
        for (slot, (metric, index)) in values.iter_mut().zip(self.metrics) {
            let raw = field(index, metric.column())?;
            *slot = raw
                .parse::<f64>()
                .ok()
                .filter(|v| v.is_finite())
                .ok_or_else(|| invalid(metric.column(), raw))?;
        }
        let [range, std_dev, mad, iqr] = values;

        Ok(DispersionRow {
            position,
            fen: self
                .fen
                .and_then(|i| fields.get(i))
                .filter(|f| !f.is_empty())
                .map(|f| f.to_string()),
            dispersion: Dispersion {
                range,
                std_dev,
                mad,
                iqr,
            },
        })
    }
}

/// Parse dispersion-file text. A missing required column is an error; bad
/// rows are skipped and recorded.
pub fn parse_dispersion_table(content: &str) -> Result<DispersionTable, InputError> {
    let mut lines = content.lines().enumerate().filter(|(_, l)| !l.trim().is_empty());
    let Some((_, header)) = lines.next() else {
        return Err(InputError::MissingColumn(POSITION_COLUMN));
    };
    let columns = Columns::locate(header)?;

    let mut table = DispersionTable::default();
    for (i, line) in lines {
        match columns.parse_row(i + 1, line) {
            Ok(row) => table.rows.push(row),
            Err(e) => {
                warn!("skipping dispersion {e}");
                table.rejected.push(e);
            }
        }
    }
    Ok(table)
}

pub fn read_dispersion_file(path: &Path) -> Result<DispersionTable, ReportError> {
    let content = fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_dispersion_table(&content)?)
}

// ---------------------------------------------------------------------------
// Critical points file
// ---------------------------------------------------------------------------

pub fn format_critical_points(metric: Metric, points: &[CriticalPoint]) -> String {
    let mut out = format!("Critical points for {}:\n", metric.label());
    for p in points {
        let [v1, v2, v3] = p.values;
        out.push_str(&format!(
            "Position {}: {} -> {} -> {}\n",
            p.start + 1,
            format_value(v1),
            format_value(v2),
            format_value(v3)
        ));
    }
    out
}

pub fn write_critical_points(
    path: &Path,
    metric: Metric,
    points: &[CriticalPoint],
) -> Result<(), ReportError> {
    fs::write(path, format_critical_points(metric, points)).map_err(|e| ReportError::io(path, e))
}

// ---------------------------------------------------------------------------
// Run summary (<stem>_summary.json)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SkipEntry {
    pub position: usize,
    pub kind: String,
    pub message: String,
}

/// Metadata of one evaluate run over one input file.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunSummary {
    pub version: u32,
    pub id: String,
    pub started_at: String,
    pub ended_at: String,
    pub duration_ms: u64,
    pub input: String,
    pub engine: String,
    pub search: SearchSettings,
    pub workers: usize,
    pub total_lines: usize,
    pub rejected_lines: usize,
    pub records: usize,
    pub skipped: Vec<SkipEntry>,
    pub skips_by_kind: BTreeMap<String, usize>,
    pub cancelled: bool,
    pub evalspread_version: String,
}

/// Engine and search context of a run.
#[derive(Debug, Clone)]
pub struct RunContext<'a> {
    pub input: &'a Path,
    pub engine: &'a str,
    pub search: SearchSettings,
    pub workers: usize,
    pub started_at: SystemTime,
}

impl RunSummary {
    pub fn new(
        ctx: &RunContext<'_>,
        total_lines: usize,
        rejected_lines: usize,
        outcome: &BatchOutcome,
    ) -> Self {
        let ended_at = SystemTime::now();
        let since_epoch = |t: SystemTime| t.duration_since(UNIX_EPOCH).unwrap_or_default();

        let skipped: Vec<SkipEntry> = outcome
            .skipped
            .iter()
            .map(|s| SkipEntry {
                position: s.position,
                kind: s.reason.kind().to_string(),
                message: s.reason.to_string(),
            })
            .collect();
        let mut skips_by_kind = BTreeMap::new();
        for s in &skipped {
            *skips_by_kind.entry(s.kind.clone()).or_insert(0) += 1;
        }

        Self {
            version: 1,
            id: Uuid::new_v4().to_string(),
            started_at: format_iso8601(since_epoch(ctx.started_at)),
            ended_at: format_iso8601(since_epoch(ended_at)),
            duration_ms: ended_at
                .duration_since(ctx.started_at)
                .unwrap_or_default()
                .as_millis() as u64,
            input: ctx.input.display().to_string(),
            engine: ctx.engine.to_string(),
            search: ctx.search,
            workers: ctx.workers,
            total_lines,
            rejected_lines,
            records: outcome.records.len(),
            skipped,
            skips_by_kind,
            cancelled: outcome.cancelled,
            evalspread_version: crate::VERSION.to_string(),
        }
    }
}

pub fn write_summary(path: &Path, summary: &RunSummary) -> Result<(), ReportError> {
    let json = serde_json::to_string_pretty(summary)?;
    fs::write(path, json).map_err(|e| ReportError::io(path, e))
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Format time since the Unix epoch as ISO-8601 UTC, e.g. `2026-02-15T01:30:00Z`.
fn format_iso8601(since_epoch: Duration) -> String {
    let secs = since_epoch.as_secs();
    let (year, month, day) = civil_date(secs / 86_400);
    let t = secs % 86_400;
    format!(
        "{year:04}-{month:02}-{day:02}T{:02}:{:02}:{:02}Z",
        t / 3600,
        t / 60 % 60,
        t % 60
    )
}

/// Days since 1970-01-01 to a Gregorian (year, month, day).
fn civil_date(days: u64) -> (u64, u64, u64) {
    // Count from 0000-03-01 so the leap day closes each 400-year era.
    let z = days + 719_468;
    let era = z / 146_097;
    let doe = z % 146_097;
    let yoe = (doe - doe / 1460 + doe / 36_524 - doe / 146_096) / 365;
    let doy = doe - (365 * yoe + yoe / 4 - yoe / 100);
    let mp = (5 * doy + 2) / 153;
    let day = doy - (153 * mp + 2) / 5 + 1;
    let month = if mp < 10 { mp + 3 } else { mp - 9 };
    (era * 400 + yoe + u64::from(month <= 2), month, day)
}

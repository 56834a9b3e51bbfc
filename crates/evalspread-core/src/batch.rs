//! File and folder drivers for the evaluate and detect stages.
//!
//! A folder input processes every `*.txt` file in it, sorted by name. A bad
//! file in a folder is logged and skipped; a path that cannot be read at all
//! is an error.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use evalspread_stats::{Metric, detect};
use log::{error, info};

use crate::chart::write_chart;
use crate::engine::EngineFactory;
use crate::error::{InputError, ReportError};
use crate::pipeline::Pipeline;
use crate::position::load_positions;
use crate::report::{
    RunContext, RunSummary, read_dispersion_file, write_critical_points, write_results,
    write_summary,
};

/// Input files named by `path`: the file itself, or the `*.txt` files of a
/// folder in name order.
pub fn input_files(path: &Path) -> Result<Vec<PathBuf>, InputError> {
    let io_err = |source| InputError::Io {
        path: path.to_path_buf(),
        source,
    };
    let meta = fs::metadata(path).map_err(io_err)?;
    if meta.is_file() {
        return Ok(vec![path.to_path_buf()]);
    }
    let mut files = Vec::new();
    for entry in fs::read_dir(path).map_err(io_err)? {
        let p = entry.map_err(io_err)?.path();
        if p.is_file() && p.extension().is_some_and(|e| e == "txt") {
            files.push(p);
        }
    }
    files.sort();
    Ok(files)
}

fn stem(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "input".to_string())
}

fn ensure_dir(dir: &Path) -> Result<(), ReportError> {
    fs::create_dir_all(dir).map_err(|e| ReportError::io(dir, e))
}

// ---------------------------------------------------------------------------
// Evaluate
// ---------------------------------------------------------------------------

/// What one evaluate run over one input file produced.
#[derive(Debug, Clone)]
pub struct FileEvaluation {
    pub input: PathBuf,
    pub results_path: PathBuf,
    pub summary_path: PathBuf,
    pub records: usize,
    pub skipped: usize,
    pub rejected_lines: usize,
    pub cancelled: bool,
}

/// Evaluate one FEN file into `<stem>_results.txt` and `<stem>_summary.json`
/// under `output_dir`.
pub fn evaluate_file<F: EngineFactory>(
    pipeline: &Pipeline<'_, F>,
    engine_name: &str,
    input: &Path,
    output_dir: &Path,
) -> Result<FileEvaluation, ReportError> {
    let started_at = SystemTime::now();
    let batch = load_positions(input)?;
    info!(
        "{}: {} positions ({} rejected lines)",
        input.display(),
        batch.positions.len(),
        batch.rejected.len()
    );

    let outcome = pipeline.run(&batch.positions)?;

    ensure_dir(output_dir)?;
    let name = stem(input);
    let results_path = output_dir.join(format!("{name}_results.txt"));
    let summary_path = output_dir.join(format!("{name}_summary.json"));
    write_results(&results_path, &outcome.records)?;

    let ctx = RunContext {
        input,
        engine: engine_name,
        search: pipeline.settings(),
        workers: pipeline.workers(),
        started_at,
    };
    let summary = RunSummary::new(&ctx, batch.total_lines(), batch.rejected.len(), &outcome);
    write_summary(&summary_path, &summary)?;
    info!("results written to {}", results_path.display());

    Ok(FileEvaluation {
        input: input.to_path_buf(),
        results_path,
        summary_path,
        records: outcome.records.len(),
        skipped: outcome.skipped.len(),
        rejected_lines: batch.rejected.len(),
        cancelled: outcome.cancelled,
    })
}

/// Evaluate a FEN file or every FEN file of a folder.
///
/// An engine that cannot be started aborts the whole run. Other per-file
/// failures are logged and the next file is processed. Cancellation stops
/// after the file in progress.
pub fn evaluate_path<F: EngineFactory>(
    pipeline: &Pipeline<'_, F>,
    engine_name: &str,
    input: &Path,
    output_dir: &Path,
) -> Result<Vec<FileEvaluation>, ReportError> {
    let files = input_files(input)?;
    if files.is_empty() {
        info!("no .txt files in {}", input.display());
    }
    let mut done = Vec::with_capacity(files.len());
    for file in files {
        if pipeline.is_stopped() {
            info!("stopping before {}", file.display());
            break;
        }
        match evaluate_file(pipeline, engine_name, &file, output_dir) {
            Ok(evaluation) => done.push(evaluation),
            Err(e @ ReportError::Pipeline(_)) => return Err(e),
            Err(e) => error!("{}: {e}", file.display()),
        }
    }
    Ok(done)
}

// ---------------------------------------------------------------------------
// Detect
// ---------------------------------------------------------------------------

/// Critical points found in one dispersion file.
#[derive(Debug, Clone)]
pub struct FileDetection {
    pub input: PathBuf,
    pub output_dir: PathBuf,
    /// Number of critical windows per metric, in output order.
    pub counts: Vec<(Metric, usize)>,
}

/// Run the detector over the four metric sequences of one dispersion file.
///
/// Writes `<Label>_critical_points.txt` and `<Label>_graph.svg` per metric
/// into `output_dir/analysis_results_<stem>`.
pub fn detect_file(input: &Path, output_dir: &Path) -> Result<FileDetection, ReportError> {
    let table = read_dispersion_file(input)?;
    let sequences = table.sequences();
    let dir = output_dir.join(format!("analysis_results_{}", stem(input)));
    ensure_dir(&dir)?;

    let mut counts = Vec::with_capacity(Metric::ALL.len());
    for metric in Metric::ALL {
        let values = sequences.get(metric);
        let points = detect(values);
        let label = metric.label();
        write_critical_points(&dir.join(format!("{label}_critical_points.txt")), metric, &points)?;
        write_chart(&dir.join(format!("{label}_graph.svg")), metric, values, &points)?;
        info!(
            "{}: {} critical points for {label} over {} positions",
            input.display(),
            points.len(),
            values.len()
        );
        counts.push((metric, points.len()));
    }

    Ok(FileDetection {
        input: input.to_path_buf(),
        output_dir: dir,
        counts,
    })
}

/// Detect over a dispersion file or every `*.txt` dispersion file of a folder.
pub fn detect_path(input: &Path, output_dir: &Path) -> Result<Vec<FileDetection>, ReportError> {
    let files = input_files(input)?;
    let mut done = Vec::with_capacity(files.len());
    for file in files {
        match detect_file(&file, output_dir) {
            Ok(detection) => done.push(detection),
            Err(e) => error!("{}: {e}", file.display()),
        }
    }
    Ok(done)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SearchSettings;
    use crate::engine::testing::*;
    use crate::pipeline::DispersionRecord;
    use evalspread_stats::Dispersion;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";

    fn factory() -> ScriptedFactory {
        ScriptedFactory::new(
            ScriptedEngine::default()
                .answer(START, vec![cp_line(1, 30, "e2e4"), cp_line(2, 25, "d2d4")])
                .answer(AFTER_E4, vec![cp_line(1, -30, "e7e5")])
                .answer(AFTER_D4, vec![cp_line(1, -10, "d7d5")]),
        )
    }

    fn settings() -> SearchSettings {
        SearchSettings {
            candidates: 2,
            depth: 6,
        }
    }

    #[test]
    fn test_input_files_filters_and_sorts() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.txt", "a.txt", "notes.md"] {
            fs::write(dir.path().join(name), "").unwrap();
        }
        fs::create_dir(dir.path().join("sub.txt")).unwrap();
        let files = input_files(dir.path()).unwrap();
        let names: Vec<String> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.txt", "b.txt"]);

        let single = dir.path().join("notes.md");
        assert_eq!(input_files(&single).unwrap(), vec![single]);
    }

    #[test]
    fn test_missing_input_path_is_error() {
        let err = input_files(Path::new("/no/such/folder")).unwrap_err();
        assert!(err.to_string().contains("/no/such/folder"));
    }

    #[test]
    fn test_evaluate_folder_writes_per_file_outputs() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("one.txt"), format!("{START}\nbroken\n{START}\n")).unwrap();
        fs::write(input.path().join("two.txt"), format!("{START}\n")).unwrap();
        let out_dir = output.path().join("nested");

        let factory = factory();
        let pipeline = Pipeline::new(&factory, settings());
        let done = evaluate_path(&pipeline, "scripted", input.path(), &out_dir).unwrap();
        assert_eq!(done.len(), 2);
        assert_eq!(done[0].records, 2);
        assert_eq!(done[0].rejected_lines, 1);

        let results = fs::read_to_string(out_dir.join("one_results.txt")).unwrap();
        let lines: Vec<&str> = results.lines().collect();
        assert_eq!(lines.len(), 3);
        assert!(lines[1].starts_with(&format!("1, {START}, 20, 10.0, 10.0, 10.0")));
        assert!(lines[2].starts_with("3, "));
        assert!(out_dir.join("two_summary.json").is_file());
    }

    #[test]
    fn test_detect_file_writes_all_metrics() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        let records: Vec<DispersionRecord> = [100.0, 50.0, 40.0, 45.0]
            .iter()
            .enumerate()
            .map(|(i, v)| DispersionRecord {
                position: i + 1,
                fen: START.into(),
                scores: vec![],
                dispersion: Dispersion {
                    range: *v,
                    std_dev: *v / 2.0,
                    mad: 1.0,
                    iqr: *v,
                },
            })
            .collect();
        let results_path = input.path().join("game_results.txt");
        write_results(&results_path, &records).unwrap();

        let detection = detect_file(&results_path, output.path()).unwrap();
        let dir = output.path().join("analysis_results_game_results");
        assert_eq!(detection.output_dir, dir);
        for label in ["Variance", "IQR", "SD", "MAD"] {
            assert!(dir.join(format!("{label}_critical_points.txt")).is_file());
            assert!(dir.join(format!("{label}_graph.svg")).is_file());
        }
        let variance = fs::read_to_string(dir.join("Variance_critical_points.txt")).unwrap();
        assert_eq!(
            variance,
            "Critical points for Variance:\nPosition 1: 100.0 -> 50.0 -> 40.0\n"
        );
        let mad = fs::read_to_string(dir.join("MAD_critical_points.txt")).unwrap();
        assert_eq!(mad, "Critical points for MAD:\n");
        let counts: Vec<usize> = detection.counts.iter().map(|(_, n)| *n).collect();
        assert_eq!(counts, vec![1, 1, 1, 0]);
    }

    #[test]
    fn test_detect_path_continues_past_bad_file() {
        let input = tempfile::tempdir().unwrap();
        let output = tempfile::tempdir().unwrap();
        fs::write(input.path().join("a.txt"), "no header here\n1, 2\n").unwrap();
        fs::write(
            input.path().join("b.txt"),
            "Position Number, FEN, Variance, Standard Deviation, MAD, IQR\n1, x, 1.0, 1.0, 1.0, 1.0\n",
        )
        .unwrap();
        let done = detect_path(input.path(), output.path()).unwrap();
        assert_eq!(done.len(), 1);
        assert!(done[0].input.ends_with("b.txt"));
    }
}

//! # evalspread-core
//!
//! **How much do the engine's best moves disagree?**
//!
//! `evalspread-core` drives an external UCI chess engine over a batch of
//! positions. For each position it samples the engine's top-K candidate
//! moves, evaluates the position each candidate produces, and measures how
//! widely those evaluations spread (range, standard deviation, MAD, IQR).
//! The resulting per-position metric sequences are then scanned for
//! critical points: three-step dips where the spread falls sharply.
//!
//! ## Quick Start
//!
//! ```no_run
//! use evalspread_core::{EngineConfig, Pipeline, SearchSettings, UciLauncher, load_positions};
//!
//! let launcher = UciLauncher::new(EngineConfig::default());
//! let pipeline = Pipeline::new(&launcher, SearchSettings::default());
//!
//! let batch = load_positions(std::path::Path::new("games/opening.txt")).unwrap();
//! let outcome = pipeline.run(&batch.positions).unwrap();
//! for record in &outcome.records {
//!     println!("{}: range {}", record.position, record.dispersion.range);
//! }
//! ```
//!
//! ## Architecture
//!
//! Position → Sampler (top-K, MultiPV) → Scorer (one query per child
//! position) → Statistics → Metric sequences → Detector → Reports/charts
//!
//! Engines sit behind the [`Engine`] and [`EngineFactory`] traits. Each
//! pipeline worker owns its session; a failed session is dropped and
//! reopened for the next position.

pub mod batch;
pub mod chart;
pub mod config;
pub mod engine;
pub mod error;
pub mod pipeline;
pub mod position;
pub mod report;
pub mod sampler;
pub mod scorer;

pub use batch::{
    FileDetection, FileEvaluation, detect_file, detect_path, evaluate_file, evaluate_path,
    input_files,
};
pub use chart::{render_svg, write_chart};
pub use config::{EngineConfig, EvalspreadConfig, SearchSettings, load_config_from_path};
pub use engine::{Analysis, Engine, EngineFactory, Evaluation, PvLine, UciEngine, UciLauncher};
pub use error::{EngineError, InputError, PipelineError, ReportError, SkipReason};
pub use pipeline::{
    BatchOutcome, DispersionRecord, MetricSequences, Pipeline, SkippedPosition, analyse_position,
};
pub use position::{Position, PositionBatch, load_positions, parse_positions};
pub use report::{
    DispersionRow, DispersionTable, RunSummary, format_critical_points, format_results,
    parse_dispersion_table, read_dispersion_file, results_header, write_critical_points,
    write_results,
};
pub use sampler::{CandidateMove, sample_top_moves};
pub use scorer::{MATE_SCORE, MateSign, Score, ScoredMove, score_moves};

pub use evalspread_stats::{CriticalPoint, Dispersion, Metric};

/// Library version (from Cargo.toml).
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

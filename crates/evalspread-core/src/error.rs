//! Error types shared across the pipeline.
//!
//! Per-position failures ([`EngineError`], [`SkipReason::EmptyScoreSet`]) are
//! recovered by skipping the position. Only [`PipelineError`] and input
//! sources that cannot be opened at all abort a run.

use std::path::PathBuf;

use thiserror::Error;

/// Failure talking to the external engine.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("failed to start engine '{path}': {source}")]
    Spawn {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("engine exited while waiting for '{0}'")]
    Crashed(String),

    #[error("engine did not answer within {0}s while waiting for '{1}'")]
    Timeout(u64, String),

    #[error("malformed engine output: {0}")]
    Protocol(String),
}

/// Why a position contributed no dispersion record.
#[derive(Debug, Error)]
pub enum SkipReason {
    #[error(transparent)]
    Engine(#[from] EngineError),

    #[error("no candidate move produced a usable evaluation")]
    EmptyScoreSet,

    #[error("batch cancelled before this position was analysed")]
    Cancelled,
}

impl SkipReason {
    /// Short stable tag used in run summaries.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Engine(EngineError::Spawn { .. }) => "engine_spawn",
            Self::Engine(EngineError::Io(_)) => "engine_io",
            Self::Engine(EngineError::Crashed(_)) => "engine_crashed",
            Self::Engine(EngineError::Timeout(..)) => "engine_timeout",
            Self::Engine(EngineError::Protocol(_)) => "engine_protocol",
            Self::EmptyScoreSet => "empty_score_set",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Malformed input rows and unreadable input sources.
#[derive(Debug, Error)]
pub enum InputError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("line {line}: invalid FEN '{fen}': {reason}")]
    InvalidFen {
        line: usize,
        fen: String,
        reason: String,
    },

    #[error("illegal move '{uci}' in position '{fen}': {reason}")]
    IllegalMove {
        uci: String,
        fen: String,
        reason: String,
    },

    #[error("missing required column '{0}'")]
    MissingColumn(&'static str),

    #[error("row {row}: missing field '{field}'")]
    MissingField { row: usize, field: &'static str },

    #[error("row {row}: invalid number '{value}' in '{field}'")]
    InvalidNumber {
        row: usize,
        field: &'static str,
        value: String,
    },
}

/// Failures that stop a whole batch.
#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("no engine session could be opened: {0}")]
    EngineUnavailable(#[source] EngineError),
}

/// Failures while reading or writing report files.
#[derive(Debug, Error)]
pub enum ReportError {
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("chart rendering failed: {0}")]
    Chart(String),

    #[error(transparent)]
    Input(#[from] InputError),

    #[error(transparent)]
    Pipeline(#[from] PipelineError),
}

impl ReportError {
    pub(crate) fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }
}

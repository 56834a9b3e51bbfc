//! Input positions: FEN parsing, move application, input file loading.

use std::path::Path;

use log::warn;
use shakmaty::fen::Fen;
use shakmaty::uci::UciMove;
use shakmaty::{CastlingMode, Chess, EnPassantMode, Position as _};

use crate::error::InputError;

/// A validated position together with its 1-based index in the input file.
#[derive(Debug, Clone)]
pub struct Position {
    index: usize,
    fen: String,
    board: Chess,
}

impl Position {
    /// Parse and validate a FEN. The FEN text is kept as given (trimmed) and
    /// reused verbatim in queries and reports.
    pub fn from_fen(index: usize, fen: &str) -> Result<Self, InputError> {
        let fen = fen.trim();
        let invalid = |reason: String| InputError::InvalidFen {
            line: index,
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.parse().map_err(|e| invalid(format!("{e}")))?;
        let board: Chess = parsed
            .into_position(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self {
            index,
            fen: fen.to_string(),
            board,
        })
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn fen(&self) -> &str {
        &self.fen
    }

    /// Apply a UCI move and return the FEN of the resulting position.
    pub fn play_uci(&self, uci: &str) -> Result<String, InputError> {
        let illegal = |reason: String| InputError::IllegalMove {
            uci: uci.to_string(),
            fen: self.fen.clone(),
            reason,
        };
        let parsed: UciMove = uci.parse().map_err(|e| illegal(format!("{e}")))?;
        let mv = parsed
            .to_move(&self.board)
            .map_err(|e| illegal(format!("{e}")))?;
        let child = self
            .board
            .clone()
            .play(&mv)
            .map_err(|e| illegal(format!("{e}")))?;
        Ok(Fen::from_setup(child.into_setup(EnPassantMode::Legal)).to_string())
    }
}

/// Positions read from one input file.
#[derive(Debug, Default)]
pub struct PositionBatch {
    pub positions: Vec<Position>,
    /// Lines that did not hold a valid FEN. They keep their line number, so
    /// the remaining positions keep theirs.
    pub rejected: Vec<InputError>,
}

impl PositionBatch {
    /// Total number of input lines, valid or not.
    pub fn total_lines(&self) -> usize {
        self.positions.len() + self.rejected.len()
    }
}

/// Parse FEN text, one position per line. Leading and trailing whitespace of
/// the whole text is ignored; line `n` of what remains is position `n`.
pub fn parse_positions(content: &str) -> PositionBatch {
    let mut batch = PositionBatch::default();
    let content = content.trim();
    if content.is_empty() {
        return batch;
    }
    for (i, line) in content.lines().enumerate() {
        match Position::from_fen(i + 1, line) {
            Ok(position) => batch.positions.push(position),
            Err(e) => {
                warn!("skipping input {e}");
                batch.rejected.push(e);
            }
        }
    }
    batch
}

/// Read a FEN file. Only an unreadable file is an error.
pub fn load_positions(path: &Path) -> Result<PositionBatch, InputError> {
    let content = std::fs::read_to_string(path).map_err(|source| InputError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(parse_positions(&content))
}

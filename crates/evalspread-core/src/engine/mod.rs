//! Engine session abstraction.
//!
//! The pipeline talks to engines only through [`Engine`] (one live session)
//! and [`EngineFactory`] (opens sessions). [`UciEngine`] drives a real UCI
//! process; tests substitute scripted engines.

pub mod process;
pub mod uci;

pub use process::{UciEngine, UciLauncher};

use crate::error::EngineError;

/// Evaluation reported by the engine for one line, from the point of view of
/// the side to move in the analysed position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Evaluation {
    Centipawns(i32),
    /// Signed distance to mate in moves. Positive: the side to move mates.
    Mate(i32),
}

/// One principal variation of an analysis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PvLine {
    /// 1-based rank in the engine's preference order.
    pub multipv: usize,
    pub depth: Option<u32>,
    pub evaluation: Option<Evaluation>,
    pub first_move: Option<String>,
}

/// Result of one query: the final line reported for each multipv rank.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Analysis {
    /// Sorted by `multipv`.
    pub lines: Vec<PvLine>,
    /// `None` when the engine answered `bestmove (none)`.
    pub best_move: Option<String>,
}

impl Analysis {
    /// The rank-1 line, if any.
    pub fn principal(&self) -> Option<&PvLine> {
        self.lines.iter().min_by_key(|l| l.multipv)
    }
}

/// A live engine session. Queries block until the engine answers or fails.
pub trait Engine {
    /// Search `fen` to `depth` plies. `multipv` of `None` asks for the single
    /// best line.
    fn analyse(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: Option<usize>,
    ) -> Result<Analysis, EngineError>;
}

impl<E: Engine + ?Sized> Engine for Box<E> {
    fn analyse(
        &mut self,
        fen: &str,
        depth: u32,
        multipv: Option<usize>,
    ) -> Result<Analysis, EngineError> {
        (**self).analyse(fen, depth, multipv)
    }
}

/// Opens engine sessions. Shared by all pipeline workers; every worker owns
/// the sessions it opens.
pub trait EngineFactory: Sync {
    type Session: Engine + Send;

    fn open(&self) -> Result<Self::Session, EngineError>;
}

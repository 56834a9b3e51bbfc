//! Scoring candidate moves by evaluating the position each one produces.

use crate::engine::{Engine, Evaluation};
use crate::error::EngineError;
use crate::position::Position;
use crate::sampler::CandidateMove;

/// Numeric stand-in for a forced mate, in centipawns.
pub const MATE_SCORE: i32 = 15300;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MateSign {
    /// The side to move in the evaluated position mates.
    Positive,
    /// The side to move gets mated.
    Negative,
}

/// Score of the position reached after a candidate move, relative to the side
/// to move in that position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Score {
    Numeric(i32),
    Mate(MateSign),
    /// The engine reported no evaluation, or `mate 0` for a position that is
    /// already checkmate. Excluded from statistics.
    Absent,
}

impl Score {
    pub fn from_evaluation(evaluation: Option<Evaluation>) -> Self {
        match evaluation {
            Some(Evaluation::Centipawns(cp)) => Self::Numeric(cp),
            Some(Evaluation::Mate(0)) | None => Self::Absent,
            Some(Evaluation::Mate(n)) if n > 0 => Self::Mate(MateSign::Positive),
            Some(Evaluation::Mate(_)) => Self::Mate(MateSign::Negative),
        }
    }

    /// Value fed to the statistics, with mates mapped to `±MATE_SCORE`.
    pub fn value(self) -> Option<i32> {
        match self {
            Self::Numeric(cp) => Some(cp),
            Self::Mate(MateSign::Positive) => Some(MATE_SCORE),
            Self::Mate(MateSign::Negative) => Some(-MATE_SCORE),
            Self::Absent => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScoredMove {
    pub candidate: CandidateMove,
    pub child_fen: String,
    pub score: Score,
}

/// Play each candidate on `position` and evaluate the resulting position with
/// a single-line search at `depth`.
///
/// A candidate that is not legal in `position` means the engine and the move
/// generator disagree, and is reported as a protocol error.
pub fn score_moves<E: Engine + ?Sized>(
    engine: &mut E,
    position: &Position,
    candidates: &[CandidateMove],
    depth: u32,
) -> Result<Vec<ScoredMove>, EngineError> {
    let mut scored = Vec::with_capacity(candidates.len());
    for candidate in candidates {
        let child_fen = position
            .play_uci(&candidate.uci)
            .map_err(|e| EngineError::Protocol(e.to_string()))?;
        let analysis = engine.analyse(&child_fen, depth, None)?;
        let score = Score::from_evaluation(analysis.principal().and_then(|l| l.evaluation));
        scored.push(ScoredMove {
            candidate: candidate.clone(),
            child_fen,
            score,
        });
    }
    Ok(scored)
}

/// Values of all present scores, in candidate order.
pub fn present_scores(scored: &[ScoredMove]) -> Vec<i32> {
    scored.iter().filter_map(|s| s.score.value()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";
    const AFTER_E4: &str = "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1";
    const AFTER_D4: &str = "rnbqkbnr/pppppppp/8/8/3P4/8/PPP1PPPP/RNBQKBNR b KQkq - 0 1";
    const AFTER_NF3: &str = "rnbqkbnr/pppppppp/8/8/8/5N2/PPPPPPPP/RNBQKB1R b KQkq - 1 1";

    fn candidate(rank: usize, uci: &str) -> CandidateMove {
        CandidateMove {
            rank,
            uci: uci.to_string(),
        }
    }

    #[test]
    fn test_mate_mapping() {
        assert_eq!(Score::from_evaluation(Some(Evaluation::Mate(3))).value(), Some(15300));
        assert_eq!(Score::from_evaluation(Some(Evaluation::Mate(-2))).value(), Some(-15300));
        assert_eq!(Score::from_evaluation(Some(Evaluation::Mate(0))), Score::Absent);
        assert_eq!(Score::from_evaluation(Some(Evaluation::Mate(0))).value(), None);
        assert_eq!(Score::from_evaluation(Some(Evaluation::Centipawns(-40))).value(), Some(-40));
        assert_eq!(Score::from_evaluation(None).value(), None);
    }

    #[test]
    fn test_scores_each_child_position() {
        let mut engine = ScriptedEngine::default()
            .answer(AFTER_E4, vec![cp_line(1, -30, "e7e5")])
            .answer(AFTER_D4, vec![mate_line(1, 4, Some("d7d5"))]);
        let p = Position::from_fen(1, START).unwrap();
        let scored = score_moves(
            &mut engine,
            &p,
            &[candidate(1, "e2e4"), candidate(2, "d2d4"), candidate(3, "g1f3")],
            12,
        )
        .unwrap();
        assert_eq!(scored[0].child_fen, AFTER_E4);
        assert_eq!(scored[0].score, Score::Numeric(-30));
        assert_eq!(scored[1].score, Score::Mate(MateSign::Positive));
        // No scripted answer for Nf3: the engine reported nothing.
        assert_eq!(scored[2].child_fen, AFTER_NF3);
        assert_eq!(scored[2].score, Score::Absent);
        assert_eq!(present_scores(&scored), vec![-30, 15300]);
        assert!(engine.queries.iter().all(|(_, multipv)| multipv.is_none()));
    }

    #[test]
    fn test_illegal_candidate_is_protocol_error() {
        let mut engine = ScriptedEngine::default();
        let p = Position::from_fen(1, START).unwrap();
        let err = score_moves(&mut engine, &p, &[candidate(1, "e1e8")], 12).unwrap_err();
        assert!(matches!(err, EngineError::Protocol(_)));
        assert!(engine.queries.is_empty());
    }
}

//! Candidate move sampling: the engine's top-K moves for a position.

use crate::engine::Engine;
use crate::error::EngineError;
use crate::position::Position;

/// One candidate move, ranked by engine preference (1 = best).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateMove {
    pub rank: usize,
    pub uci: String,
}

/// Ask the engine for its `k` preferred moves at `depth`.
///
/// Returns fewer than `k` moves when the position has fewer legal moves, and
/// none for a terminal position. Lines without a move are dropped.
pub fn sample_top_moves<E: Engine + ?Sized>(
    engine: &mut E,
    position: &Position,
    k: usize,
    depth: u32,
) -> Result<Vec<CandidateMove>, EngineError> {
    let mut lines = engine.analyse(position.fen(), depth, Some(k))?.lines;
    lines.sort_by_key(|l| l.multipv);
    Ok(lines
        .into_iter()
        .filter_map(|l| {
            l.first_move.map(|uci| CandidateMove {
                rank: l.multipv,
                uci,
            })
        })
        .take(k)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::testing::*;

    const START: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

    #[test]
    fn test_samples_in_rank_order() {
        let mut engine = ScriptedEngine::default().answer(
            START,
            vec![
                cp_line(2, 20, "d2d4"),
                cp_line(1, 30, "e2e4"),
                cp_line(3, 15, "g1f3"),
            ],
        );
        let p = Position::from_fen(1, START).unwrap();
        let moves = sample_top_moves(&mut engine, &p, 3, 10).unwrap();
        let ucis: Vec<&str> = moves.iter().map(|m| m.uci.as_str()).collect();
        assert_eq!(ucis, vec!["e2e4", "d2d4", "g1f3"]);
        assert_eq!(moves[0].rank, 1);
        assert_eq!(engine.queries, vec![(START.to_string(), Some(3))]);
    }

    #[test]
    fn test_terminal_position_yields_no_moves() {
        let mated = "rnb1kbnr/pppp1ppp/8/4p3/6Pq/5P2/PPPPP2P/RNBQKBNR w KQkq - 1 3";
        let mut engine =
            ScriptedEngine::default().answer(mated, vec![mate_line(1, 0, None)]);
        let p = Position::from_fen(1, mated).unwrap();
        assert!(sample_top_moves(&mut engine, &p, 5, 10).unwrap().is_empty());
    }

    #[test]
    fn test_engine_failure_propagates() {
        let mut engine = ScriptedEngine::default().fail_on(START);
        let p = Position::from_fen(1, START).unwrap();
        assert!(matches!(
            sample_top_moves(&mut engine, &p, 5, 10),
            Err(EngineError::Crashed(_))
        ));
    }
}

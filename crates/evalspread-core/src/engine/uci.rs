//! UCI text protocol: command formatting and engine output parsing.
//!
//! Parsing is kept free of I/O so it can be tested against captured engine
//! output.

use super::{Evaluation, PvLine};
use crate::error::EngineError;

pub fn set_option(name: &str, value: impl std::fmt::Display) -> String {
    format!("setoption name {name} value {value}")
}

pub fn position_fen(fen: &str) -> String {
    format!("position fen {fen}")
}

pub fn go_depth(depth: u32) -> String {
    format!("go depth {depth}")
}

/// Parse a `bestmove` line.
///
/// Returns `None` for any other line, `Some(None)` for `bestmove (none)`.
pub fn parse_bestmove(line: &str) -> Option<Option<String>> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next()? != "bestmove" {
        return None;
    }
    match tokens.next() {
        Some("(none)") | Some("0000") | None => Some(None),
        Some(mv) => Some(Some(mv.to_string())),
    }
}

/// Parse the `id name` line sent during the handshake.
pub fn parse_id_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix("id name ")
        .map(str::trim)
        .filter(|s| !s.is_empty())
}

/// Parse an `info` line carrying a score and/or a principal variation.
///
/// Returns `Ok(None)` for lines that are not `info` lines or that carry
/// neither (`info string ...`, `info currmove ...`).
pub fn parse_info(line: &str) -> Result<Option<PvLine>, EngineError> {
    let mut tokens = line.split_ascii_whitespace();
    if tokens.next() != Some("info") {
        return Ok(None);
    }

    let mut multipv = 1usize;
    let mut depth = None;
    let mut evaluation = None;
    let mut first_move = None;

    while let Some(token) = tokens.next() {
        match token {
            "string" => return Ok(None),
            "depth" => depth = Some(parse_number(tokens.next(), "depth", line)?),
            "multipv" => multipv = parse_number(tokens.next(), "multipv", line)?,
            "score" => {
                evaluation = Some(match tokens.next() {
                    Some("cp") => Evaluation::Centipawns(parse_number(tokens.next(), "cp", line)?),
                    Some("mate") => Evaluation::Mate(parse_number(tokens.next(), "mate", line)?),
                    other => {
                        return Err(EngineError::Protocol(format!(
                            "unknown score kind {other:?} in '{line}'"
                        )));
                    }
                });
            }
            "pv" => {
                first_move = tokens.next().map(str::to_string);
                break;
            }
            _ => {}
        }
    }

    if evaluation.is_none() && first_move.is_none() {
        return Ok(None);
    }

    Ok(Some(PvLine {
        multipv,
        depth,
        evaluation,
        first_move,
    }))
}

fn parse_number<T: std::str::FromStr>(
    token: Option<&str>,
    field: &str,
    line: &str,
) -> Result<T, EngineError> {
    token
        .and_then(|t| t.parse().ok())
        .ok_or_else(|| EngineError::Protocol(format!("bad '{field}' value in '{line}'")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_formatting() {
        assert_eq!(set_option("Hash", 4096), "setoption name Hash value 4096");
        assert_eq!(go_depth(20), "go depth 20");
        assert_eq!(
            position_fen("8/8/8/8/8/8/8/K6k w - - 0 1"),
            "position fen 8/8/8/8/8/8/8/K6k w - - 0 1"
        );
    }

    #[test]
    fn test_parse_multipv_cp_line() {
        let line = "info depth 20 seldepth 28 multipv 3 score cp -17 nodes 1843021 nps 921510 \
                    hashfull 412 tbhits 0 time 2000 pv g1f3 d7d5 d2d4";
        let pv = parse_info(line).unwrap().unwrap();
        assert_eq!(pv.multipv, 3);
        assert_eq!(pv.depth, Some(20));
        assert_eq!(pv.evaluation, Some(Evaluation::Centipawns(-17)));
        assert_eq!(pv.first_move.as_deref(), Some("g1f3"));
    }

    #[test]
    fn test_parse_mate_with_bound_and_wdl() {
        let line = "info depth 12 multipv 1 score mate -3 upperbound wdl 0 0 1000 nodes 10 pv h2h3";
        let pv = parse_info(line).unwrap().unwrap();
        assert_eq!(pv.evaluation, Some(Evaluation::Mate(-3)));
        assert_eq!(pv.first_move.as_deref(), Some("h2h3"));
    }

    #[test]
    fn test_missing_multipv_defaults_to_one() {
        let pv = parse_info("info depth 5 score cp 12 pv e2e4").unwrap().unwrap();
        assert_eq!(pv.multipv, 1);
    }

    #[test]
    fn test_checkmated_position_has_score_without_pv() {
        let pv = parse_info("info depth 0 score mate 0").unwrap().unwrap();
        assert_eq!(pv.evaluation, Some(Evaluation::Mate(0)));
        assert!(pv.first_move.is_none());
    }

    #[test]
    fn test_lines_without_payload_ignored() {
        assert!(parse_info("info string NNUE evaluation using nn-1111.nnue").unwrap().is_none());
        assert!(parse_info("info depth 20 currmove e2e4 currmovenumber 1").unwrap().is_none());
        assert!(parse_info("readyok").unwrap().is_none());
        assert!(parse_info("").unwrap().is_none());
    }

    #[test]
    fn test_malformed_numbers_are_protocol_errors() {
        assert!(matches!(
            parse_info("info depth 3 score cp abc pv e2e4"),
            Err(EngineError::Protocol(_))
        ));
        assert!(matches!(
            parse_info("info multipv x score cp 1"),
            Err(EngineError::Protocol(_))
        ));
        assert!(matches!(
            parse_info("info score wdl 1 2 3"),
            Err(EngineError::Protocol(_))
        ));
    }

    #[test]
    fn test_parse_bestmove() {
        assert_eq!(parse_bestmove("bestmove e2e4 ponder e7e5"), Some(Some("e2e4".into())));
        assert_eq!(parse_bestmove("bestmove (none)"), Some(None));
        assert_eq!(parse_bestmove("info depth 1"), None);
    }

    #[test]
    fn test_parse_id_name() {
        assert_eq!(parse_id_name("id name Stockfish 16.1"), Some("Stockfish 16.1"));
        assert_eq!(parse_id_name("id author the Stockfish developers"), None);
    }
}

//! Standard chess rules backed by the `chess` crate.
//!
//! Accepted notations:
//!
//! - UCI: `e2e4`, `e7e8q`
//! - SAN: `e4`, `Nf3`, `O-O`, `exd5`
//!
//! Clients that always attach a queen promotion (`e2e4q`) are tolerated: a
//! promotion suffix on a move that is not a promotion is dropped.

// ============================================================================
// Imports
// ============================================================================

use std::str::FromStr;

use chess::{Board, BoardStatus, ChessMove};

use super::{RulesEngine, RulesError, TerminalStatus};

// ============================================================================
// ChessRules
// ============================================================================

/// Rules engine for standard chess from the initial position.
#[derive(Debug, Clone, Copy, Default)]
pub struct ChessRules;

impl ChessRules {
    /// Creates the engine.
    #[inline]
    #[must_use]
    pub const fn new() -> Self {
        Self
    }

    /// Resolves a notation to a legal move in `board`.
    fn resolve(board: &Board, notation: &str) -> Result<ChessMove, RulesError> {
        let notation = notation.trim();

        if let Ok(uci) = ChessMove::from_str(notation) {
            if board.legal(uci) {
                return Ok(uci);
            }

            if uci.get_promotion().is_some() {
                let plain = ChessMove::new(uci.get_source(), uci.get_dest(), None);
                if board.legal(plain) {
                    return Ok(plain);
                }
            }

            return Err(RulesError::illegal(notation));
        }

        let san = ChessMove::from_san(board, notation)
            .map_err(|_| RulesError::unreadable(notation))?;

        // from_san resolves by pattern; confirm legality in this position
        if board.legal(san) {
            Ok(san)
        } else {
            Err(RulesError::illegal(notation))
        }
    }
}

impl RulesEngine for ChessRules {
    type State = Board;

    fn initial_state(&self) -> Board {
        Board::default()
    }

    fn apply_move(
        &self,
        state: &Board,
        notation: &str,
    ) -> Result<(Board, TerminalStatus), RulesError> {
        let chess_move = Self::resolve(state, notation)?;
        let next = state.make_move_new(chess_move);

        let status = match next.status() {
            BoardStatus::Ongoing => TerminalStatus::Ongoing,
            BoardStatus::Checkmate => TerminalStatus::Checkmate,
            BoardStatus::Stalemate => TerminalStatus::Stalemate,
        };

        Ok((next, status))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use chess::Color;

    fn play(rules: &ChessRules, moves: &[&str]) -> (Board, TerminalStatus) {
        let mut board = rules.initial_state();
        let mut status = TerminalStatus::Ongoing;
        for notation in moves {
            let (next, next_status) = rules.apply_move(&board, notation).expect("legal move");
            board = next;
            status = next_status;
        }
        (board, status)
    }

    #[test]
    fn test_uci_move() {
        let rules = ChessRules::new();
        let (board, status) = play(&rules, &["e2e4"]);
        assert_eq!(status, TerminalStatus::Ongoing);
        assert_eq!(board.side_to_move(), Color::Black);
    }

    #[test]
    fn test_san_move() {
        let rules = ChessRules::new();
        let (board, status) = play(&rules, &["Nf3"]);
        assert_eq!(status, TerminalStatus::Ongoing);
        assert_eq!(board.side_to_move(), Color::Black);
    }

    #[test]
    fn test_spurious_promotion_is_dropped() {
        let rules = ChessRules::new();
        let (board, _) = play(&rules, &["e2e4q"]);
        assert_eq!(board.side_to_move(), Color::Black);
    }

    #[test]
    fn test_illegal_move_rejected() {
        let rules = ChessRules::new();
        let board = rules.initial_state();

        let err = rules.apply_move(&board, "e2e5").expect_err("illegal");
        assert_eq!(err, RulesError::illegal("e2e5"));

        // Black cannot move first
        assert!(rules.apply_move(&board, "e7e5").is_err());
    }

    #[test]
    fn test_unreadable_move_rejected() {
        let rules = ChessRules::new();
        let board = rules.initial_state();
        assert!(rules.apply_move(&board, "hello").is_err());
    }

    #[test]
    fn test_rejected_move_leaves_state_untouched() {
        let rules = ChessRules::new();
        let board = rules.initial_state();
        let _ = rules.apply_move(&board, "e2e5");
        assert_eq!(board, Board::default());
    }

    #[test]
    fn test_fools_mate_is_checkmate() {
        let rules = ChessRules::new();
        let (_, status) = play(&rules, &["f2f3", "e7e5", "g2g4", "d8h4"]);
        assert_eq!(status, TerminalStatus::Checkmate);
    }

    #[test]
    fn test_stalemate_detected() {
        let rules = ChessRules::new();
        let board = Board::from_str("7k/8/8/6Q1/8/8/8/K7 w - - 0 1").expect("fen");
        let (_, status) = rules.apply_move(&board, "g5g6").expect("legal");
        assert_eq!(status, TerminalStatus::Stalemate);
    }
}

//! Turn-legality seam.
//!
//! The session never interprets moves itself. It hands the notation to a
//! [`RulesEngine`] together with the current state and gets back the next
//! state plus any terminal condition intrinsic to the game. Clock-based
//! outcomes are decided by the session, not here.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`RulesEngine`] | Validates and applies a move |
//! | [`TerminalStatus`] | Game-intrinsic outcome after a move |
//! | [`RulesError`] | Why a move was refused |
//! | [`ChessRules`] | Standard chess via the `chess` crate |

// ============================================================================
// Imports
// ============================================================================

use thiserror::Error;

// ============================================================================
// Submodules
// ============================================================================

/// Standard chess rules.
pub mod chess;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::chess::ChessRules;

// ============================================================================
// TerminalStatus
// ============================================================================

/// Game-intrinsic status after an accepted move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TerminalStatus {
    /// The game continues.
    Ongoing,
    /// The side to move is mated; the mover won.
    Checkmate,
    /// The side to move has no legal move and is not in check.
    Stalemate,
}

// ============================================================================
// RulesError
// ============================================================================

/// A move the rules engine refused.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RulesError {
    /// The notation could not be read in any supported format.
    #[error("Unreadable move notation: {notation}")]
    Unreadable {
        /// The offending notation.
        notation: String,
    },

    /// The notation names a move that is not legal in the position.
    #[error("Illegal move: {notation}")]
    Illegal {
        /// The offending notation.
        notation: String,
    },
}

impl RulesError {
    /// Creates an unreadable notation error.
    #[inline]
    pub fn unreadable(notation: impl Into<String>) -> Self {
        Self::Unreadable {
            notation: notation.into(),
        }
    }

    /// Creates an illegal move error.
    #[inline]
    pub fn illegal(notation: impl Into<String>) -> Self {
        Self::Illegal {
            notation: notation.into(),
        }
    }
}

// ============================================================================
// RulesEngine
// ============================================================================

/// Validates and applies moves for one kind of game.
///
/// Implementations are stateless; the game state is owned by the session
/// and passed in on every call. A refused move must leave no trace, which
/// the signature guarantees by taking the state by reference.
pub trait RulesEngine: Send + Sync + 'static {
    /// Position of a game in progress.
    type State: Clone + Send + 'static;

    /// Returns the state of a fresh game.
    fn initial_state(&self) -> Self::State;

    /// Applies `notation` to `state`.
    ///
    /// # Errors
    ///
    /// Returns [`RulesError`] if the move cannot be read or is illegal.
    fn apply_move(
        &self,
        state: &Self::State,
        notation: &str,
    ) -> Result<(Self::State, TerminalStatus), RulesError>;
}

// ============================================================================
// Tests
// ============================================================================

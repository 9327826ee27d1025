//! Game and clock state machine of one session.
//!
//! # States
//!
//! ```text
//!            accepted move                 terminal condition
//! Active(w) ──────────────► Active(b) ... ─────────────────────► Ended(reason)
//!     ▲                          │
//!     └──────────────────────────┘
//! ```
//!
//! Termination is evaluated after every accepted move in a fixed order:
//! checkmate, stalemate, first mover flagged, second mover flagged. A move
//! that mates therefore wins even if the mover's clock ran out in the same
//! step.
//!
//! All time-dependent operations take `now` explicitly.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::rules::{RulesEngine, RulesError, TerminalStatus};

use super::clock::{ClockConfig, ClockPair};
use super::Role;

// ============================================================================
// EndReason
// ============================================================================

/// Why a session ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EndReason {
    /// The last mover delivered mate.
    Checkmate,
    /// The side to move has no legal move.
    DrawStalemate,
    /// The first mover ran out of time.
    TimeoutFirstMover,
    /// The second mover ran out of time.
    TimeoutSecondMover,
    /// A participant disconnected.
    OpponentLeft,
}

impl EndReason {
    /// Returns the forfeit reason for `role`.
    #[inline]
    #[must_use]
    pub const fn timeout(role: Role) -> Self {
        match role {
            Role::FirstMover => Self::TimeoutFirstMover,
            Role::SecondMover => Self::TimeoutSecondMover,
        }
    }

    /// Returns the wire name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Checkmate => "CHECKMATE",
            Self::DrawStalemate => "DRAW_STALEMATE",
            Self::TimeoutFirstMover => "TIMEOUT_FIRST_MOVER",
            Self::TimeoutSecondMover => "TIMEOUT_SECOND_MOVER",
            Self::OpponentLeft => "OPPONENT_LEFT",
        }
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ============================================================================
// Phase
// ============================================================================

/// Lifecycle state of a game.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// In progress; `turn` is the side to move.
    Active {
        /// Side whose clock is running.
        turn: Role,
    },
    /// Finished.
    Ended(EndReason),
}

// ============================================================================
// MoveRejection
// ============================================================================

/// Why a move was not applied. A rejected move changes nothing.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum MoveRejection {
    /// The game is already over.
    #[error("Session already ended: {reason}")]
    SessionEnded {
        /// How it ended.
        reason: EndReason,
    },

    /// The mover is not the side to move.
    #[error("Not {mover}'s turn")]
    NotYourTurn {
        /// The side that tried to move.
        mover: Role,
    },

    /// The rules engine refused the move.
    #[error(transparent)]
    Illegal(#[from] RulesError),
}

// ============================================================================
// GameSession
// ============================================================================

/// Rules state, clocks and turn of one paired game.
pub struct GameSession<R: RulesEngine> {
    /// Shared rules engine.
    rules: Arc<R>,
    /// Current position.
    state: R::State,
    /// Committed clock balances.
    clocks: ClockPair,
    /// Credit per accepted move.
    increment: Duration,
    /// Lifecycle state.
    phase: Phase,
    /// Instant of the last accepted move, or of the start.
    last_move_at: Instant,
    /// Number of accepted moves.
    moves_played: u32,
}

impl<R: RulesEngine> fmt::Debug for GameSession<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GameSession")
            .field("phase", &self.phase)
            .field("clocks", &self.clocks)
            .field("moves_played", &self.moves_played)
            .finish_non_exhaustive()
    }
}

impl<R: RulesEngine> GameSession<R> {
    /// Starts a game at `started_at` with the first mover to play.
    #[must_use]
    pub fn new(rules: Arc<R>, clock: ClockConfig, started_at: Instant) -> Self {
        let state = rules.initial_state();
        Self {
            rules,
            state,
            clocks: ClockPair::new(clock.initial),
            increment: clock.increment,
            phase: Phase::Active {
                turn: Role::FirstMover,
            },
            last_move_at: started_at,
            moves_played: 0,
        }
    }

    /// Returns the lifecycle state.
    #[inline]
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns `true` while the game is in progress.
    #[inline]
    #[must_use]
    pub fn is_active(&self) -> bool {
        matches!(self.phase, Phase::Active { .. })
    }

    /// Returns the side to move, if the game is in progress.
    #[inline]
    #[must_use]
    pub fn turn(&self) -> Option<Role> {
        match self.phase {
            Phase::Active { turn } => Some(turn),
            Phase::Ended(_) => None,
        }
    }

    /// Returns the number of accepted moves.
    #[inline]
    #[must_use]
    pub fn moves_played(&self) -> u32 {
        self.moves_played
    }

    /// Returns the committed balances, excluding the running charge.
    #[inline]
    #[must_use]
    pub fn clocks(&self) -> ClockPair {
        self.clocks
    }

    /// Returns `role`'s remaining time as of `now`.
    ///
    /// Includes the running charge when `role` is to move.
    #[must_use]
    pub fn remaining_at(&self, role: Role, now: Instant) -> Duration {
        self.live_clocks(now).remaining(role)
    }

    /// Applies a move by `mover` received at `now`.
    ///
    /// On success returns the phase after the move. The mover is charged for
    /// the time since the previous accepted move, then credited the
    /// increment unless the charge overdrew the clock.
    ///
    /// # Errors
    ///
    /// Returns [`MoveRejection`] if the game is over, it is not `mover`'s
    /// turn, or the rules engine refuses the move. Nothing changes then.
    pub fn handle_move_at(
        &mut self,
        mover: Role,
        notation: &str,
        now: Instant,
    ) -> Result<Phase, MoveRejection> {
        let turn = match self.phase {
            Phase::Ended(reason) => return Err(MoveRejection::SessionEnded { reason }),
            Phase::Active { turn } => turn,
        };

        if mover != turn {
            return Err(MoveRejection::NotYourTurn { mover });
        }

        let mut clocks = self.clocks;
        clocks.charge(mover, now.saturating_duration_since(self.last_move_at));

        let (next, status) = self.rules.apply_move(&self.state, notation)?;

        if !clocks.is_flagged(mover) {
            clocks.credit(mover, self.increment);
        }

        self.state = next;
        self.clocks = clocks;
        self.last_move_at = now;
        self.moves_played += 1;
        self.phase = self.evaluate(status, mover.opponent());

        Ok(self.phase)
    }

    /// Ends the game if the side to move has run out of time by `now`.
    ///
    /// Returns the resulting phase.
    pub fn check_flag_at(&mut self, now: Instant) -> Phase {
        if let Phase::Active { turn } = self.phase {
            let live = self.live_clocks(now);
            if live.is_flagged(turn) {
                self.clocks = live;
                self.last_move_at = now;
                self.phase = Phase::Ended(EndReason::timeout(turn));
            }
        }
        self.phase
    }

    /// Ends the game with `reason`.
    ///
    /// Returns `false` (and changes nothing) if it had already ended.
    pub fn end(&mut self, reason: EndReason) -> bool {
        if self.is_active() {
            self.phase = Phase::Ended(reason);
            true
        } else {
            false
        }
    }

    /// Balances with the running charge applied to the side to move.
    fn live_clocks(&self, now: Instant) -> ClockPair {
        let mut clocks = self.clocks;
        if let Phase::Active { turn } = self.phase {
            clocks.charge(turn, now.saturating_duration_since(self.last_move_at));
        }
        clocks
    }

    /// Termination priority after an accepted move.
    fn evaluate(&self, status: TerminalStatus, next_turn: Role) -> Phase {
        match status {
            TerminalStatus::Checkmate => Phase::Ended(EndReason::Checkmate),
            TerminalStatus::Stalemate => Phase::Ended(EndReason::DrawStalemate),
            TerminalStatus::Ongoing => Role::BOTH
                .into_iter()
                .find(|role| self.clocks.is_flagged(*role))
                .map_or(Phase::Active { turn: next_turn }, |role| {
                    Phase::Ended(EndReason::timeout(role))
                }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

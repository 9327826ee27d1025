//! Two-sided countdown clock.
//!
//! Time is charged lazily: nothing ticks in the background. When a move
//! arrives the session computes the elapsed time since the previous accepted
//! move and charges it to the mover. Internally the balance is signed so an
//! overdraft is visible as a forfeit; reported values are clamped at zero.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use super::Role;

// ============================================================================
// Constants
// ============================================================================

/// Default allotment per side.
const DEFAULT_INITIAL: Duration = Duration::from_secs(10 * 60);

// ============================================================================
// ClockConfig
// ============================================================================

/// Time control applied to every new session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockConfig {
    /// Starting time for each side.
    pub initial: Duration,
    /// Time credited to the mover after each accepted move.
    pub increment: Duration,
}

impl ClockConfig {
    /// Creates a time control.
    #[inline]
    #[must_use]
    pub const fn new(initial: Duration, increment: Duration) -> Self {
        Self { initial, increment }
    }

    /// Creates a time control of `minutes` per side without increment.
    ///
    /// Saturates at [`Duration::from_secs(u64::MAX)`](Duration::from_secs).
    #[inline]
    #[must_use]
    pub const fn minutes(minutes: u64) -> Self {
        Self::new(Duration::from_secs(minutes.saturating_mul(60)), Duration::ZERO)
    }
}

impl Default for ClockConfig {
    fn default() -> Self {
        Self::new(DEFAULT_INITIAL, Duration::ZERO)
    }
}

// ============================================================================
// ClockPair
// ============================================================================

/// Remaining time of both sides, in signed nanoseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockPair {
    remaining: [i128; 2],
}

impl ClockPair {
    /// Creates a pair with both sides at `initial`.
    #[inline]
    #[must_use]
    pub fn new(initial: Duration) -> Self {
        let nanos = initial.as_nanos() as i128;
        Self {
            remaining: [nanos, nanos],
        }
    }

    /// Subtracts `elapsed` from `role`'s balance.
    #[inline]
    pub fn charge(&mut self, role: Role, elapsed: Duration) {
        self.remaining[role.index()] -= elapsed.as_nanos() as i128;
    }

    /// Adds `amount` to `role`'s balance.
    #[inline]
    pub fn credit(&mut self, role: Role, amount: Duration) {
        self.remaining[role.index()] += amount.as_nanos() as i128;
    }

    /// Returns `true` once `role` has no time left.
    #[inline]
    #[must_use]
    pub fn is_flagged(&self, role: Role) -> bool {
        self.remaining[role.index()] <= 0
    }

    /// Returns `role`'s remaining time, clamped at zero.
    #[inline]
    #[must_use]
    pub fn remaining(&self, role: Role) -> Duration {
        let nanos = self.remaining[role.index()].max(0);
        Duration::from_nanos(u64::try_from(nanos).unwrap_or(u64::MAX))
    }

    /// Returns `role`'s remaining time in whole milliseconds.
    #[inline]
    #[must_use]
    pub fn remaining_ms(&self, role: Role) -> u64 {
        u64::try_from(self.remaining(role).as_millis()).unwrap_or(u64::MAX)
    }
}

// ============================================================================
// Tests
// ============================================================================

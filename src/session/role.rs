//! Side assignment within a pair.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::{Deserialize, Serialize};

// ============================================================================
// Role
// ============================================================================

/// The side a participant plays.
///
/// The first member of a pairing moves first and is announced as `"w"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// Moves first (`"w"`).
    #[serde(rename = "w")]
    FirstMover,
    /// Moves second (`"b"`).
    #[serde(rename = "b")]
    SecondMover,
}

impl Role {
    /// Both roles in turn order.
    pub const BOTH: [Self; 2] = [Self::FirstMover, Self::SecondMover];

    /// Returns the other side.
    #[inline]
    #[must_use]
    pub const fn opponent(self) -> Self {
        match self {
            Self::FirstMover => Self::SecondMover,
            Self::SecondMover => Self::FirstMover,
        }
    }

    /// Returns the wire color.
    #[inline]
    #[must_use]
    pub const fn color(self) -> &'static str {
        match self {
            Self::FirstMover => "w",
            Self::SecondMover => "b",
        }
    }

    #[inline]
    pub(crate) const fn index(self) -> usize {
        match self {
            Self::FirstMover => 0,
            Self::SecondMover => 1,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.color())
    }
}

// ============================================================================
// Tests
// ============================================================================

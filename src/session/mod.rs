//! Paired sessions.
//!
//! | Module | Description |
//! |--------|-------------|
//! | `role` | First and second mover |
//! | `clock` | Time control and two-sided countdown |
//! | `game` | Turn, clock and termination state machine |
//! | `relay` | Announcement, relay loop and teardown |

// ============================================================================
// Submodules
// ============================================================================

/// Time control and countdown.
pub mod clock;

/// Game state machine.
pub mod game;

/// Relay loop.
pub mod relay;

/// Side assignment.
pub mod role;

// ============================================================================
// Re-exports
// ============================================================================

pub use clock::{ClockConfig, ClockPair};
pub use game::{EndReason, GameSession, MoveRejection, Phase};
pub use relay::{RelayMode, Session};
pub use role::Role;

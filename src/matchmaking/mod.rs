//! Matchmaking: waiting pool, pairing sweep and scheduler.
//!
//! # Flow
//!
//! ```text
//! admission ──► WaitingPool ──take_all──► pair_snapshot ──► Pairing ──► Session
//!                    ▲                          │
//!                    └────────restore───────────┘ (unmatched)
//! ```
//!
//! | Module | Description |
//! |--------|-------------|
//! | `participant` | Connected participant handle and membership |
//! | `pool` | Waiting pool |
//! | `pairer` | One greedy pairing sweep |
//! | `matchmaker` | Periodic sweep driver and session registry |

// ============================================================================
// Submodules
// ============================================================================

/// Periodic sweep driver.
pub mod matchmaker;

/// Pairing sweep.
pub mod pairer;

/// Participant handle.
pub mod participant;

/// Waiting pool.
pub mod pool;

// ============================================================================
// Re-exports
// ============================================================================

pub use matchmaker::{Matchmaker, SweepReport};
pub use pairer::{Pairing, SweepOutcome, pair_snapshot};
pub use participant::{Membership, Participant};
pub use pool::WaitingPool;

//! WebSocket protocol message types.
//!
//! Every frame is a JSON object carrying a `type` discriminator.
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | `MATCH_FOUND` | Lobby → Client | Pairing announcement with color and room |
//! | `OPPONENT_LEFT` | Lobby → Client | Peer disconnected, session over |
//! | `GAME_OVER` | Lobby → Client | Game decided by the rules or the clock |
//! | `MOVE` | Client → Client | Move, validated by the lobby before relay; rejected moves are dropped |
//! | anything else | Client → Client | Relayed verbatim (e.g. `CHAT`) |
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `envelope` | Opaque JSON object frame |
//! | `message` | Typed lobby notices and move extraction |

// ============================================================================
// Submodules
// ============================================================================

/// Opaque JSON object frame.
pub mod envelope;

/// Typed lobby notices and move payloads.
pub mod message;

// ============================================================================
// Re-exports
// ============================================================================

pub use envelope::Envelope;
pub use message::{MOVE_KIND, MoveRequest, Notice};

//! Chess Lobby - WebSocket matchmaking and move relay for two-player chess.
//!
//! Clients connect with an identity, wait in a pool, get paired two by two,
//! and then talk to each other through the lobby for the rest of the game.
//!
//! # Architecture
//!
//! - **Admission**: the `userId` query parameter is checked during the
//!   WebSocket upgrade
//! - **Matchmaking**: a periodic sweep probes waiting clients and pairs them
//!   greedily, never with themselves
//! - **Session**: each pair gets a room, a rules state and two countdown
//!   clocks; frames are relayed between the two clients
//!
//! Key design principles:
//!
//! - Each connection owns one writer task; frames never interleave
//! - The waiting pool is the only process-wide shared state
//! - Client frames stay opaque except for `MOVE`
//! - The first terminal event of a session wins
//!
//! # Quick Start
//!
//! ```no_run
//! use chess_lobby::{Lobby, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let lobby = Lobby::builder().bind("0.0.0.0:8080").build()?.start().await?;
//!     println!("Listening on {}", lobby.ws_url());
//!
//!     tokio::signal::ctrl_c().await?;
//!     lobby.shutdown().await;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`lobby`] | Service, builder and options |
//! | [`matchmaking`] | Waiting pool, pairing sweep, scheduler |
//! | [`session`] | Game state machine, clocks, relay |
//! | [`rules`] | Move validation seam and chess rules |
//! | [`protocol`] | Wire frames and lobby notices |
//! | [`transport`] | WebSocket connection and listener |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`identifiers`] | Type-safe ID wrappers |

// ============================================================================
// Modules
// ============================================================================

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Type-safe identifiers for lobby entities.
pub mod identifiers;

/// Lobby service and configuration.
///
/// Use [`Lobby::builder()`] to create a configured lobby.
pub mod lobby;

/// Waiting pool, pairing and scheduling.
pub mod matchmaking;

/// Wire message types.
pub mod protocol;

/// Move validation.
pub mod rules;

/// Paired sessions.
pub mod session;

/// WebSocket transport layer.
pub mod transport;

#[cfg(test)]
pub(crate) mod test_support;

// ============================================================================
// Re-exports
// ============================================================================

// Lobby types
pub use lobby::{Lobby, LobbyBuilder, LobbyOptions, RunningLobby};

// Matchmaking types
pub use matchmaking::{Membership, Participant, WaitingPool};

// Session types
pub use session::{ClockConfig, EndReason, RelayMode, Role};

// Rules types
pub use rules::{ChessRules, RulesEngine};

// Error types
pub use error::{Error, Result};

// Identifier types
pub use identifiers::{ConnectionId, ParticipantId, RoomId};

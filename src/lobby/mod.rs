//! Lobby service module.
//!
//! This module provides the main entry point for running the matchmaking
//! server.
//!
//! # Components
//!
//! | Type | Description |
//! |------|-------------|
//! | [`Lobby`] | Configured service, not yet listening |
//! | [`RunningLobby`] | Listening service with shutdown |
//! | [`LobbyBuilder`] | Fluent configuration builder |
//! | [`LobbyOptions`] | Sweep, probe, clock and relay settings |
//!
//! # Example
//!
//! ```no_run
//! use chess_lobby::{Lobby, LobbyOptions, Result};
//!
//! # async fn example() -> Result<()> {
//! let lobby = Lobby::builder()
//!     .bind("0.0.0.0:8080")
//!     .options(LobbyOptions::new().with_clock_minutes(5))
//!     .build()?
//!     .start()
//!     .await?;
//!
//! lobby.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Submodules
// ============================================================================

/// Fluent builder for lobby configuration.
pub mod builder;

/// Core lobby implementation.
pub mod core;

/// Runtime options.
pub mod options;

// ============================================================================
// Re-exports
// ============================================================================

pub use builder::{DEFAULT_BIND, LobbyBuilder};
pub use core::{Lobby, RunningLobby};
pub use options::{LobbyOptions, MAX_CLOCK};

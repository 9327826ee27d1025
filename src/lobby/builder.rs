//! Builder pattern for lobby configuration.
//!
//! # Example
//!
//! ```ignore
//! use chess_lobby::{Lobby, LobbyOptions};
//!
//! let lobby = Lobby::builder()
//!     .bind("127.0.0.1:8080")
//!     .options(LobbyOptions::new().with_clock_minutes(5))
//!     .build()?;
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::net::SocketAddr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::rules::{ChessRules, RulesEngine};

use super::core::Lobby;
use super::options::LobbyOptions;

// ============================================================================
// Constants
// ============================================================================

/// Address used when none is configured.
pub const DEFAULT_BIND: &str = "0.0.0.0:8080";

// ============================================================================
// LobbyBuilder
// ============================================================================

/// Builder for configuring a [`Lobby`].
///
/// Use [`Lobby::builder()`] to create a new builder.
pub struct LobbyBuilder<R = ChessRules> {
    /// Listen address, unparsed.
    bind: Option<String>,
    /// Runtime options.
    options: LobbyOptions,
    /// Rules engine shared by all sessions.
    rules: Arc<R>,
}

impl Default for LobbyBuilder<ChessRules> {
    fn default() -> Self {
        Self::new()
    }
}

impl LobbyBuilder<ChessRules> {
    /// Creates a builder with default options and standard chess rules.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            bind: None,
            options: LobbyOptions::default(),
            rules: Arc::new(ChessRules::new()),
        }
    }
}

// ============================================================================
// LobbyBuilder Implementation
// ============================================================================

impl<R: RulesEngine> LobbyBuilder<R> {
    /// Sets the listen address, e.g. `"127.0.0.1:0"`.
    #[inline]
    #[must_use]
    pub fn bind(mut self, addr: impl Into<String>) -> Self {
        self.bind = Some(addr.into());
        self
    }

    /// Sets the runtime options.
    #[inline]
    #[must_use]
    pub fn options(mut self, options: LobbyOptions) -> Self {
        self.options = options;
        self
    }

    /// Replaces the rules engine.
    #[inline]
    #[must_use]
    pub fn rules<R2: RulesEngine>(self, rules: R2) -> LobbyBuilder<R2> {
        LobbyBuilder {
            bind: self.bind,
            options: self.options,
            rules: Arc::new(rules),
        }
    }

    /// Builds the lobby with validation.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the bind address does not parse
    /// - [`Error::Config`] if an option is out of range
    pub fn build(self) -> Result<Lobby<R>> {
        let bind = self.validate_bind()?;
        self.options.validate()?;

        Ok(Lobby::new(bind, self.options, self.rules))
    }
}

// ============================================================================
// Validation
// ============================================================================

impl<R: RulesEngine> LobbyBuilder<R> {
    /// Parses the configured address.
    fn validate_bind(&self) -> Result<SocketAddr> {
        let raw = self.bind.as_deref().unwrap_or(DEFAULT_BIND);

        raw.parse().map_err(|_| {
            Error::config(format!(
                "Invalid bind address: {raw:?}\n\
                 Expected IP:PORT, e.g. Lobby::builder().bind(\"127.0.0.1:8080\")"
            ))
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

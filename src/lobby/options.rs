//! Runtime options for the lobby.
//!
//! # Example
//!
//! ```ignore
//! use std::time::Duration;
//! use chess_lobby::{LobbyOptions, RelayMode};
//!
//! let options = LobbyOptions::new()
//!     .with_sweep_interval(Duration::from_millis(500))
//!     .with_clock_minutes(5)
//!     .with_increment(Duration::from_secs(3))
//!     .with_relay_mode(RelayMode::Unchecked);
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use crate::error::{Error, Result};
use crate::session::{ClockConfig, RelayMode};

// ============================================================================
// Constants
// ============================================================================

/// Default pause between pairing sweeps.
const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(2);

/// Default deadline for a liveness probe.
const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(1);

/// Default deadline for the WebSocket upgrade.
const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// Longest accepted initial time or increment.
pub const MAX_CLOCK: Duration = Duration::from_secs(24 * 60 * 60);

// ============================================================================
// LobbyOptions
// ============================================================================

/// Lobby tuning knobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LobbyOptions {
    /// Pause between pairing sweeps.
    pub sweep_interval: Duration,

    /// Deadline for each liveness probe during a sweep.
    pub probe_timeout: Duration,

    /// Deadline for a client to finish the WebSocket upgrade.
    pub handshake_timeout: Duration,

    /// Time control of new sessions.
    pub clock: ClockConfig,

    /// How sessions treat `MOVE` frames.
    pub relay_mode: RelayMode,
}

impl Default for LobbyOptions {
    fn default() -> Self {
        Self::new()
    }
}

// ============================================================================
// Constructors
// ============================================================================

impl LobbyOptions {
    /// Creates options with default settings.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self {
            sweep_interval: DEFAULT_SWEEP_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
            clock: ClockConfig::default(),
            relay_mode: RelayMode::default(),
        }
    }
}

// ============================================================================
// Builder Methods
// ============================================================================

impl LobbyOptions {
    /// Sets the pause between pairing sweeps.
    #[inline]
    #[must_use]
    pub fn with_sweep_interval(mut self, interval: Duration) -> Self {
        self.sweep_interval = interval;
        self
    }

    /// Sets the liveness probe deadline.
    #[inline]
    #[must_use]
    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    /// Sets the WebSocket upgrade deadline.
    #[inline]
    #[must_use]
    pub fn with_handshake_timeout(mut self, timeout: Duration) -> Self {
        self.handshake_timeout = timeout;
        self
    }

    /// Sets the time control.
    #[inline]
    #[must_use]
    pub fn with_clock(mut self, clock: ClockConfig) -> Self {
        self.clock = clock;
        self
    }

    /// Sets the initial time per side in minutes, keeping the increment.
    ///
    /// Values past [`MAX_CLOCK`] are caught by [`validate`](Self::validate).
    #[inline]
    #[must_use]
    pub fn with_clock_minutes(mut self, minutes: u64) -> Self {
        self.clock.initial = ClockConfig::minutes(minutes).initial;
        self
    }

    /// Sets the per-move increment.
    #[inline]
    #[must_use]
    pub fn with_increment(mut self, increment: Duration) -> Self {
        self.clock.increment = increment;
        self
    }

    /// Sets the relay mode.
    #[inline]
    #[must_use]
    pub fn with_relay_mode(mut self, mode: RelayMode) -> Self {
        self.relay_mode = mode;
        self
    }
}

// ============================================================================
// Validation
// ============================================================================

impl LobbyOptions {
    /// Checks that every duration is usable.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] naming the first invalid option.
    pub fn validate(&self) -> Result<()> {
        if self.sweep_interval.is_zero() {
            return Err(Error::config("Sweep interval must be greater than zero"));
        }
        if self.probe_timeout.is_zero() {
            return Err(Error::config("Probe timeout must be greater than zero"));
        }
        if self.handshake_timeout.is_zero() {
            return Err(Error::config("Handshake timeout must be greater than zero"));
        }
        if self.clock.initial.is_zero() {
            return Err(Error::config("Initial clock time must be greater than zero"));
        }
        if self.clock.initial > MAX_CLOCK || self.clock.increment > MAX_CLOCK {
            return Err(Error::config("Clock time out of range, at most 24 hours"));
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

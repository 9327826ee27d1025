//! Lobby service: listener, matchmaker and their lifecycle.
//!
//! # Example
//!
//! ```no_run
//! use chess_lobby::Lobby;
//!
//! # async fn example() -> chess_lobby::Result<()> {
//! let lobby = Lobby::builder().bind("127.0.0.1:8080").build()?.start().await?;
//! println!("Clients connect to {}?userId=<id>", lobby.ws_url());
//!
//! tokio::signal::ctrl_c().await?;
//! lobby.shutdown().await;
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::net::SocketAddr;
use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::error::Result;
use crate::matchmaking::{Matchmaker, SweepReport, WaitingPool};
use crate::rules::{ChessRules, RulesEngine};
use crate::transport::{Listener, WS_PATH};

use super::builder::LobbyBuilder;
use super::options::LobbyOptions;

// ============================================================================
// Lobby
// ============================================================================

/// A configured, not yet started lobby.
pub struct Lobby<R = ChessRules> {
    bind_addr: SocketAddr,
    options: LobbyOptions,
    rules: Arc<R>,
}

impl<R> fmt::Debug for Lobby<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Lobby")
            .field("bind_addr", &self.bind_addr)
            .field("options", &self.options)
            .finish_non_exhaustive()
    }
}

impl Lobby<ChessRules> {
    /// Creates a configuration builder.
    #[inline]
    #[must_use]
    pub fn builder() -> LobbyBuilder {
        LobbyBuilder::new()
    }
}

impl<R: RulesEngine> Lobby<R> {
    pub(crate) fn new(bind_addr: SocketAddr, options: LobbyOptions, rules: Arc<R>) -> Self {
        Self {
            bind_addr,
            options,
            rules,
        }
    }

    /// Returns the configured listen address.
    #[inline]
    #[must_use]
    pub fn bind_addr(&self) -> SocketAddr {
        self.bind_addr
    }

    /// Returns the runtime options.
    #[inline]
    #[must_use]
    pub fn options(&self) -> &LobbyOptions {
        &self.options
    }

    /// Binds the listener and starts accepting and pairing.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Io`] if binding fails.
    pub async fn start(self) -> Result<RunningLobby<R>> {
        let listener = Listener::bind(self.bind_addr, self.options.handshake_timeout).await?;
        let local_addr = listener.local_addr();

        let pool = Arc::new(WaitingPool::new());
        let matchmaker = Matchmaker::new(Arc::clone(&pool), self.rules, self.options.clone());
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let tasks = vec![
            tokio::spawn(listener.run(Arc::clone(&pool), shutdown_rx.clone())),
            tokio::spawn(Arc::clone(&matchmaker).run(shutdown_rx)),
        ];

        info!(
            %local_addr,
            sweep_ms = self.options.sweep_interval.as_millis() as u64,
            clock_secs = self.options.clock.initial.as_secs(),
            mode = ?self.options.relay_mode,
            "Lobby started"
        );

        Ok(RunningLobby {
            local_addr,
            pool,
            matchmaker,
            shutdown_tx,
            tasks,
        })
    }
}

// ============================================================================
// RunningLobby
// ============================================================================

/// A started lobby.
pub struct RunningLobby<R: RulesEngine = ChessRules> {
    local_addr: SocketAddr,
    pool: Arc<WaitingPool>,
    matchmaker: Arc<Matchmaker<R>>,
    shutdown_tx: watch::Sender<bool>,
    tasks: Vec<JoinHandle<()>>,
}

impl<R: RulesEngine> fmt::Debug for RunningLobby<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RunningLobby")
            .field("local_addr", &self.local_addr)
            .field("waiting", &self.waiting_count())
            .field("active_sessions", &self.active_sessions())
            .finish_non_exhaustive()
    }
}

impl<R: RulesEngine> RunningLobby<R> {
    /// Returns the bound address.
    #[inline]
    #[must_use]
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Returns the client URL without the identity parameter.
    ///
    /// Format: `ws://{addr}/ws`
    #[inline]
    #[must_use]
    pub fn ws_url(&self) -> String {
        format!("ws://{}{WS_PATH}", self.local_addr)
    }

    /// Returns the number of waiting participants.
    #[inline]
    #[must_use]
    pub fn waiting_count(&self) -> usize {
        self.pool.len()
    }

    /// Returns the number of running sessions.
    #[inline]
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.matchmaker.active_sessions()
    }

    /// Runs a sweep immediately, outside the schedule.
    pub async fn sweep_now(&self) -> SweepReport {
        self.matchmaker.sweep_once().await
    }

    /// Stops accepting and pairing, then closes every connection.
    pub async fn shutdown(self) {
        info!("Lobby shutting down");

        self.shutdown_tx.send_replace(true);

        for task in self.tasks {
            if let Err(e) = task.await {
                debug!(error = %e, "Background task ended abnormally");
            }
        }

        self.pool.drain_and_close();
        let aborted = self.matchmaker.abort_sessions();

        info!(aborted_sessions = aborted, "Lobby shutdown complete");
    }
}

// ============================================================================
// Tests
// ============================================================================

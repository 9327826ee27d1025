//! Periodic pairing scheduler.
//!
//! Every interval the matchmaker snapshots the pool, pairs it, puts the
//! unmatched back and spawns one session task per pair. Sweeps never
//! overlap: a single task drives them and a slow sweep delays the next tick.

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;

use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};
use tracing::{debug, info};

use crate::identifiers::RoomId;
use crate::lobby::LobbyOptions;
use crate::rules::RulesEngine;
use crate::session::{EndReason, Session};

use super::{Pairing, WaitingPool, pair_snapshot};

// ============================================================================
// SweepReport
// ============================================================================

/// Counters of one sweep.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    /// Participants in the snapshot.
    pub waiting: usize,
    /// Sessions started.
    pub paired: usize,
    /// Participants put back into the pool.
    pub returned: usize,
    /// Participants closed.
    pub dropped: usize,
}

// ============================================================================
// Matchmaker
// ============================================================================

/// Drives pairing sweeps and owns the running sessions.
pub struct Matchmaker<R: RulesEngine> {
    pool: Arc<WaitingPool>,
    rules: Arc<R>,
    options: LobbyOptions,
    sessions: Mutex<FxHashMap<RoomId, Arc<Session<R>>>>,
}

impl<R: RulesEngine> Matchmaker<R> {
    /// Creates a matchmaker over `pool`.
    #[must_use]
    pub fn new(pool: Arc<WaitingPool>, rules: Arc<R>, options: LobbyOptions) -> Arc<Self> {
        Arc::new(Self {
            pool,
            rules,
            options,
            sessions: Mutex::new(FxHashMap::default()),
        })
    }

    /// Returns the waiting pool.
    #[inline]
    #[must_use]
    pub fn pool(&self) -> &Arc<WaitingPool> {
        &self.pool
    }

    /// Returns the number of running sessions.
    #[inline]
    #[must_use]
    pub fn active_sessions(&self) -> usize {
        self.sessions.lock().len()
    }

    /// Runs sweeps until `shutdown` turns `true`.
    ///
    /// The first sweep happens one interval after start.
    pub async fn run(self: Arc<Self>, mut shutdown: watch::Receiver<bool>) {
        let period = self.options.sweep_interval;
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        info!(interval_ms = period.as_millis() as u64, "Matchmaking loop started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    self.sweep_once().await;
                }
                _ = async { let _ = shutdown.wait_for(|stop| *stop).await; } => {
                    debug!("Matchmaking loop shutting down");
                    break;
                }
            }
        }

        debug!("Matchmaking loop terminated");
    }

    /// Runs one sweep now.
    pub async fn sweep_once(self: &Arc<Self>) -> SweepReport {
        let snapshot = self.pool.take_all();
        let waiting = snapshot.len();

        let outcome = pair_snapshot(snapshot, self.options.probe_timeout).await;

        let report = SweepReport {
            waiting,
            paired: outcome.pairings.len(),
            returned: outcome.unmatched.len(),
            dropped: outcome.dropped.len(),
        };

        self.pool.restore(outcome.unmatched);

        for pairing in outcome.pairings {
            self.spawn_session(pairing);
        }

        if waiting > 0 {
            debug!(
                waiting = report.waiting,
                paired = report.paired,
                returned = report.returned,
                dropped = report.dropped,
                "Sweep finished"
            );
        }

        report
    }

    /// Closes every running session.
    ///
    /// Returns how many were aborted. Their tasks finish on their own.
    pub fn abort_sessions(&self) -> usize {
        let sessions: Vec<_> = self.sessions.lock().values().cloned().collect();
        for session in &sessions {
            session.abort();
        }
        sessions.len()
    }

    /// Starts a session task for `pairing`.
    fn spawn_session(self: &Arc<Self>, pairing: Pairing) -> JoinHandle<EndReason> {
        let session = Arc::new(Session::from_pairing(
            pairing,
            Arc::clone(&self.rules),
            self.options.clock,
            self.options.relay_mode,
        ));
        let room_id = session.room_id().clone();

        self.sessions
            .lock()
            .insert(room_id.clone(), Arc::clone(&session));

        let matchmaker = Arc::clone(self);
        tokio::spawn(async move {
            let reason = session.run().await;
            matchmaker.sessions.lock().remove(&room_id);
            reason
        })
    }
}

// ============================================================================
// Tests
// ============================================================================

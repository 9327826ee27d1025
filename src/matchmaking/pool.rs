//! Waiting pool of connected-but-unpaired participants.
//!
//! A single mutex around a `Vec`. `take_all` and `restore` are separate
//! critical sections, so an `enqueue` may land between them; restored
//! participants are put ahead of such newcomers.

// ============================================================================
// Imports
// ============================================================================

use parking_lot::Mutex;
use tracing::{debug, info};

use crate::identifiers::ConnectionId;

use super::Participant;

// ============================================================================
// WaitingPool
// ============================================================================

/// Participants waiting to be paired.
///
/// Invariants: no connection appears twice and every member is
/// [`Membership::Waiting`](super::Membership::Waiting).
#[derive(Debug, Default)]
pub struct WaitingPool {
    members: Mutex<Vec<Participant>>,
}

impl WaitingPool {
    /// Creates an empty pool.
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a participant and marks it waiting.
    ///
    /// Returns `false` if the same connection is already in the pool.
    pub fn enqueue(&self, participant: Participant) -> bool {
        let mut members = self.members.lock();

        if members
            .iter()
            .any(|member| member.connection_id() == participant.connection_id())
        {
            debug!(participant = %participant.id(), "Connection already waiting");
            return false;
        }

        participant.mark_waiting();
        debug!(
            participant = %participant.id(),
            connection = %participant.connection_id(),
            waiting = members.len() + 1,
            "Participant enqueued"
        );
        members.push(participant);
        true
    }

    /// Takes every waiting participant, leaving the pool empty.
    #[must_use]
    pub fn take_all(&self) -> Vec<Participant> {
        std::mem::take(&mut *self.members.lock())
    }

    /// Puts unmatched participants back, ahead of any newcomers.
    pub fn restore(&self, unmatched: Vec<Participant>) {
        if unmatched.is_empty() {
            return;
        }

        for participant in &unmatched {
            participant.mark_waiting();
        }

        let mut members = self.members.lock();
        let newcomers = std::mem::replace(&mut *members, unmatched);
        members.extend(newcomers);
    }

    /// Returns the number of waiting participants.
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.members.lock().len()
    }

    /// Returns `true` if nobody is waiting.
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.members.lock().is_empty()
    }

    /// Returns `true` if the connection is waiting.
    #[must_use]
    pub fn contains(&self, connection_id: ConnectionId) -> bool {
        self.members
            .lock()
            .iter()
            .any(|member| member.connection_id() == connection_id)
    }

    /// Removes a waiting connection.
    pub fn remove(&self, connection_id: ConnectionId) -> Option<Participant> {
        let mut members = self.members.lock();
        let index = members
            .iter()
            .position(|member| member.connection_id() == connection_id)?;
        let participant = members.remove(index);
        participant.release();
        Some(participant)
    }

    /// Closes and removes every waiting participant.
    ///
    /// Returns how many were closed.
    pub fn drain_and_close(&self) -> usize {
        let members = self.take_all();
        let count = members.len();

        for participant in members {
            participant.close();
            participant.release();
        }

        if count > 0 {
            info!(count, "Closed waiting participants");
        }
        count
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Connected participant handle.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::Mutex;
use tracing::trace;

use crate::error::Result;
use crate::identifiers::{ConnectionId, ParticipantId, RoomId};
use crate::protocol::{Envelope, Notice};
use crate::transport::ConnectionHandle;

// ============================================================================
// Membership
// ============================================================================

/// Where a participant currently is. Exactly one holds at any instant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Membership {
    /// Connected but neither waiting nor playing.
    Idle,
    /// In the waiting pool.
    Waiting,
    /// Bound to a session.
    InSession,
}

// ============================================================================
// Participant
// ============================================================================

/// Mutable part of a participant.
#[derive(Debug)]
struct State {
    membership: Membership,
    room: Option<RoomId>,
}

/// Shared part of a participant.
struct Inner {
    id: ParticipantId,
    connection_id: ConnectionId,
    connection: Arc<dyn ConnectionHandle>,
    state: Mutex<State>,
}

/// A connected entity eligible for pairing.
///
/// Cheap to clone; all clones refer to the same connection and state.
#[derive(Clone)]
pub struct Participant {
    inner: Arc<Inner>,
}

impl fmt::Debug for Participant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Participant")
            .field("id", &self.inner.id)
            .field("connection_id", &self.inner.connection_id)
            .field("state", &*self.inner.state.lock())
            .finish()
    }
}

impl Participant {
    /// Creates an idle participant for an accepted connection.
    pub fn new(id: ParticipantId, connection: Arc<dyn ConnectionHandle>) -> Self {
        Self {
            inner: Arc::new(Inner {
                id,
                connection_id: ConnectionId::generate(),
                connection,
                state: Mutex::new(State {
                    membership: Membership::Idle,
                    room: None,
                }),
            }),
        }
    }

    /// Returns the identity.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &ParticipantId {
        &self.inner.id
    }

    /// Returns the connection ID.
    #[inline]
    #[must_use]
    pub fn connection_id(&self) -> ConnectionId {
        self.inner.connection_id
    }

    /// Returns the underlying connection.
    #[inline]
    #[must_use]
    pub fn connection(&self) -> &Arc<dyn ConnectionHandle> {
        &self.inner.connection
    }

    /// Returns the current membership.
    #[inline]
    #[must_use]
    pub fn membership(&self) -> Membership {
        self.inner.state.lock().membership
    }

    /// Returns the room while in a session.
    #[must_use]
    pub fn room(&self) -> Option<RoomId> {
        self.inner.state.lock().room.clone()
    }

    /// Marks the participant as waiting.
    pub fn mark_waiting(&self) {
        let mut state = self.inner.state.lock();
        state.membership = Membership::Waiting;
        state.room = None;
    }

    /// Binds the participant to `room`.
    pub fn mark_in_session(&self, room: RoomId) {
        let mut state = self.inner.state.lock();
        state.membership = Membership::InSession;
        state.room = Some(room);
    }

    /// Returns the participant to idle.
    pub fn release(&self) {
        let mut state = self.inner.state.lock();
        state.membership = Membership::Idle;
        state.room = None;
    }

    /// Sends a raw frame.
    ///
    /// # Errors
    ///
    /// Propagates the connection's write error.
    #[inline]
    pub async fn send(&self, envelope: Envelope) -> Result<()> {
        self.inner.connection.send(envelope).await
    }

    /// Sends a lobby notice.
    ///
    /// # Errors
    ///
    /// Propagates serialization or write errors.
    pub async fn notify(&self, notice: &Notice) -> Result<()> {
        let envelope = notice.to_envelope()?;
        trace!(participant = %self.inner.id, kind = ?envelope.kind(), "Sending notice");
        self.send(envelope).await
    }

    /// Probes liveness within `deadline`.
    ///
    /// # Errors
    ///
    /// Returns the probe failure.
    #[inline]
    pub async fn probe(&self, deadline: Duration) -> Result<()> {
        self.inner.connection.probe(deadline).await
    }

    /// Closes the connection. Idempotent.
    #[inline]
    pub fn close(&self) {
        self.inner.connection.close();
    }

    /// Returns `true` once the connection is closed.
    #[inline]
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.inner.connection.is_closed()
    }
}

// ============================================================================
// Tests
// ============================================================================

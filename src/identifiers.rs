//! Type-safe identifiers for lobby entities.
//!
//! | Type | Meaning |
//! |------|---------|
//! | [`ParticipantId`] | Identity supplied by the client at admission |
//! | [`ConnectionId`] | One accepted connection (an identity may connect twice) |
//! | [`RoomId`] | One paired session |

// ============================================================================
// Imports
// ============================================================================

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Literal identities that browsers produce for unset variables.
const PLACEHOLDER_IDENTITIES: &[&str] = &["null", "undefined"];

// ============================================================================
// ParticipantId
// ============================================================================

/// Opaque, stable identity of a participant.
///
/// Never empty and never one of the placeholder literals `"null"` or
/// `"undefined"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParticipantId(String);

impl ParticipantId {
    /// Parses an identity supplied at admission.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Admission`] for empty or placeholder identities.
    pub fn parse(raw: impl Into<String>) -> Result<Self> {
        let raw = raw.into();

        if raw.is_empty() {
            return Err(Error::admission("identity is empty"));
        }
        if PLACEHOLDER_IDENTITIES.contains(&raw.as_str()) {
            return Err(Error::admission(format!("placeholder identity: {raw}")));
        }

        Ok(Self(raw))
    }

    /// Returns the identity as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ParticipantId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Unique identifier of one accepted connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Generates a fresh connection ID.
    #[inline]
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.simple())
    }
}

// ============================================================================
// RoomId
// ============================================================================

/// Last issued room timestamp, keeps room IDs strictly increasing.
static LAST_ROOM_NANOS: AtomicU64 = AtomicU64::new(0);

/// Identifier of a paired session, formatted `room_<unix-nanos>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoomId(String);

impl RoomId {
    /// Generates a room ID from the current wall clock.
    ///
    /// Two pairings in the same nanosecond (or a clock stepping backwards)
    /// still get distinct IDs.
    #[must_use]
    pub fn generate() -> Self {
        let now = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| u64::try_from(d.as_nanos()).unwrap_or(u64::MAX))
            .unwrap_or_default();

        let mut last = LAST_ROOM_NANOS.load(Ordering::Relaxed);
        let nanos = loop {
            let next = now.max(last.saturating_add(1));
            match LAST_ROOM_NANOS.compare_exchange_weak(
                last,
                next,
                Ordering::Relaxed,
                Ordering::Relaxed,
            ) {
                Ok(_) => break next,
                Err(current) => last = current,
            }
        };

        Self(format!("room_{nanos}"))
    }

    /// Returns the room ID as a string slice.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RoomId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ============================================================================
// Tests
// ============================================================================

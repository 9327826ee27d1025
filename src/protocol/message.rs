//! Typed lobby notices and move payloads.
//!
//! Notices are produced by the lobby itself; client traffic stays opaque
//! except for `MOVE`, whose notation is extracted for validation.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::identifiers::{ParticipantId, RoomId};
use crate::session::{EndReason, Role};

use super::Envelope;

// ============================================================================
// Constants
// ============================================================================

/// Discriminator of move messages.
pub const MOVE_KIND: &str = "MOVE";

// ============================================================================
// Notice
// ============================================================================

/// A message originated by the lobby.
///
/// # Format
///
/// ```json
/// { "type": "MATCH_FOUND", "color": "w", "opponent_id": "bob", "room_id": "room_1" }
/// { "type": "OPPONENT_LEFT" }
/// { "type": "GAME_OVER", "reason": "CHECKMATE", "white_ms": 512000, "black_ms": 498000 }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Notice {
    /// Sent once to each member of a new pair.
    MatchFound {
        /// `"w"` for the first mover, `"b"` for the second.
        color: Role,
        /// Identity of the paired opponent.
        opponent_id: ParticipantId,
        /// Room shared by both members.
        room_id: RoomId,
    },

    /// Sent to the surviving participant when the peer goes away.
    OpponentLeft,

    /// Sent to both participants when the game is decided.
    GameOver {
        /// Terminal reason.
        reason: EndReason,
        /// First mover's remaining time in milliseconds.
        white_ms: u64,
        /// Second mover's remaining time in milliseconds.
        black_ms: u64,
    },
}

impl Notice {
    /// Converts the notice into a wire frame.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Json`] if serialization fails.
    #[inline]
    pub fn to_envelope(&self) -> Result<Envelope> {
        Envelope::from_serialize(self)
    }
}

// ============================================================================
// MoveRequest
// ============================================================================

/// Shape of the `move` field of a `MOVE` message.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum MovePayload {
    /// `"Nf3"` or `"g1f3"`.
    Notation(String),
    /// `{ "from": "e2", "to": "e4", "promotion": "q" }`.
    Squares {
        from: String,
        to: String,
        #[serde(default)]
        promotion: Option<String>,
    },
}

/// The notation carried by a `MOVE` message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MoveRequest {
    notation: String,
}

impl MoveRequest {
    /// Extracts the move notation from a `MOVE` frame.
    ///
    /// The square form becomes UCI (`from` + `to` + optional promotion).
    ///
    /// # Errors
    ///
    /// Returns [`Error::Protocol`] if the frame is not a `MOVE` or its
    /// `move` field is missing or malformed.
    pub fn from_envelope(envelope: &Envelope) -> Result<Self> {
        if !envelope.is_kind(MOVE_KIND) {
            return Err(Error::protocol(format!(
                "expected {MOVE_KIND}, got {:?}",
                envelope.kind()
            )));
        }

        let payload = envelope
            .get("move")
            .cloned()
            .ok_or_else(|| Error::protocol("MOVE without a move field"))?;

        let notation = match serde_json::from_value::<MovePayload>(payload)
            .map_err(|e| Error::protocol(format!("unreadable move: {e}")))?
        {
            MovePayload::Notation(notation) => notation.trim().to_owned(),
            MovePayload::Squares {
                from,
                to,
                promotion,
            } => {
                let mut uci = format!("{}{}", from.trim(), to.trim()).to_ascii_lowercase();
                if let Some(piece) = promotion {
                    uci.push_str(&piece.trim().to_ascii_lowercase());
                }
                uci
            }
        };

        if notation.is_empty() {
            return Err(Error::protocol("empty move notation"));
        }

        Ok(Self { notation })
    }

    /// Returns the move notation.
    #[inline]
    #[must_use]
    pub fn notation(&self) -> &str {
        &self.notation
    }
}

// ============================================================================
// Tests
// ============================================================================

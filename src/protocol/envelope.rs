//! Opaque message frame.
//!
//! The lobby only inspects the `type` field of client traffic; the rest is
//! relayed untouched, so frames are kept as a raw JSON object.

// ============================================================================
// Imports
// ============================================================================

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::Result;

// ============================================================================
// Envelope
// ============================================================================

/// A structured message: a JSON object with a `type` discriminator.
///
/// # Format
///
/// ```json
/// { "type": "CHAT", "text": "gl hf" }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Envelope(Map<String, Value>);

impl Envelope {
    /// Parses a frame from JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the text is not a JSON object.
    pub fn parse(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Parses a frame from raw JSON bytes.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the bytes are not a JSON object.
    pub fn parse_slice(bytes: &[u8]) -> Result<Self> {
        Ok(serde_json::from_slice(bytes)?)
    }

    /// Converts any serializable value into a frame.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if the value does not serialize to an
    /// object.
    pub fn from_serialize<T: Serialize>(value: &T) -> Result<Self> {
        Ok(serde_json::from_value(serde_json::to_value(value)?)?)
    }

    /// Serializes the frame to JSON text.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::Json`] if serialization fails.
    pub fn to_text(&self) -> Result<String> {
        Ok(serde_json::to_string(&self.0)?)
    }

    /// Returns the `type` discriminator, if present and a string.
    #[inline]
    #[must_use]
    pub fn kind(&self) -> Option<&str> {
        self.0.get("type").and_then(Value::as_str)
    }

    /// Returns `true` if the discriminator equals `kind`.
    #[inline]
    #[must_use]
    pub fn is_kind(&self, kind: &str) -> bool {
        self.kind() == Some(kind)
    }

    /// Returns a field by key.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }
}

impl From<Map<String, Value>> for Envelope {
    fn from(map: Map<String, Value>) -> Self {
        Self(map)
    }
}

// ============================================================================
// Tests
// ============================================================================

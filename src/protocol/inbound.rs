//! Inbound event frames.
//!
//! Frames pushed by the relay to a sink.
//!
//! # Format
//!
//! ```json
//! {
//!   "data": {
//!     "event": "ping",
//!     "payload": 1
//!   }
//! }
//! ```
//!
//! Anything else is a protocol error.

// ============================================================================
// Imports
// ============================================================================

use serde::Deserialize;
use serde_json::{Map, Value, from_slice, from_str};

use crate::error::{Error, Result};

// ============================================================================
// Frame
// ============================================================================

/// Wire envelope around the event object.
#[derive(Debug, Deserialize)]
struct Frame {
    data: Map<String, Value>,
}

// ============================================================================
// InboundMessage
// ============================================================================

/// A parsed inbound event.
///
/// `data` is the frame's whole `data` object, `event` field included.
/// This is the value handed to listeners.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundMessage {
    event: String,
    data: Value,
}

impl InboundMessage {
    /// Parses a text frame.
    ///
    /// # Errors
    ///
    /// [`Error::Protocol`] if the frame is not JSON, has no `data` object,
    /// or `data.event` is missing or not a string.
    pub fn parse(text: &str) -> Result<Self> {
        let frame: Frame =
            from_str(text).map_err(|e| Error::protocol(format!("malformed frame: {e}")))?;
        Self::from_frame(frame)
    }

    /// Parses a binary frame carrying UTF-8 JSON.
    ///
    /// # Errors
    ///
    /// Same as [`InboundMessage::parse`].
    pub fn parse_bytes(bytes: &[u8]) -> Result<Self> {
        let frame: Frame =
            from_slice(bytes).map_err(|e| Error::protocol(format!("malformed frame: {e}")))?;
        Self::from_frame(frame)
    }

    fn from_frame(frame: Frame) -> Result<Self> {
        let event = frame
            .data
            .get("event")
            .and_then(Value::as_str)
            .ok_or_else(|| Error::protocol("frame data has no string `event` field"))?
            .to_owned();

        Ok(Self {
            event,
            data: Value::Object(frame.data),
        })
    }

    /// Returns the event name.
    #[inline]
    #[must_use]
    pub fn event(&self) -> &str {
        &self.event
    }

    /// Returns the event object.
    #[inline]
    #[must_use]
    pub fn data(&self) -> &Value {
        &self.data
    }

    /// Returns a field of the event object.
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.data.get(key)
    }

    /// Consumes the message, returning the event object.
    #[inline]
    #[must_use]
    pub fn into_data(self) -> Value {
        self.data
    }
}

// ============================================================================
// Tests
// ============================================================================

//! JSON serialization for wire events.
//!
//! The messaging endpoint speaks line-delimited JSON text frames, so the
//! codec works on `String`s rather than byte buffers.

use crate::event::WireEvent;

/// Error type for codec encode/decode operations.
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// Serialization or deserialization failed.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Encodes a [`WireEvent`] as a JSON string.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the event cannot be serialized.
pub fn encode(event: &WireEvent) -> Result<String, CodecError> {
    Ok(serde_json::to_string(event)?)
}

/// Decodes a [`WireEvent`] from a JSON string.
///
/// Frames missing required fields (a message without a `sender.email`, an
/// unknown `type` tag) fail to decode; callers are expected to discard
/// such frames rather than treat the failure as fatal.
///
/// # Errors
///
/// Returns [`CodecError::Serialization`] if the string is not a valid event.
pub fn decode(raw: &str) -> Result<WireEvent, CodecError> {
    Ok(serde_json::from_str(raw)?)
}

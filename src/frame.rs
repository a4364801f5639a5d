//! Wire frame model and JSON codec for the relay connection.
//!
//! DESIGN
//! ======
//! Every protocol message is one JSON object with a `type` discriminator:
//!
//! - `{"type":"chat","message":"<text>"}` — chat content
//! - `{"type":"typing"}` — transient presence signal
//! - `{"type":"endChat"}` — local termination notice
//! - `{"type":"matchEnded"}` — remote termination notice (received only)
//! - `{"type":"rematchRequested"}` — remote rematch notice (received only)
//!
//! ERROR HANDLING
//! ==============
//! A payload that is not valid JSON, not an object envelope, or carries an
//! unrecognized `type` decodes to [`CodecError::Malformed`]. Callers log the
//! failure and drop the frame — a bad frame must never take the session down
//! or surface as anything louder than a diagnostic.

use serde::{Deserialize, Serialize};

/// Error returned by [`encode`] and [`decode`].
#[derive(Debug, thiserror::Error)]
pub enum CodecError {
    /// The wire payload is not a parseable envelope or has an unknown `type`.
    #[error("malformed frame: {0}")]
    Malformed(#[source] serde_json::Error),
    /// The in-memory frame could not be serialized.
    #[error("failed to encode frame: {0}")]
    Encode(#[source] serde_json::Error),
}

/// One discrete protocol message exchanged over the transport.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum Frame {
    /// Chat content from one participant to the other.
    Chat { message: String },
    /// The remote (or local) participant is composing a message.
    Typing,
    /// Sent when the local participant ends the chat.
    EndChat,
    /// Received when the remote participant ended the chat.
    MatchEnded,
    /// Received when the remote participant asked for a rematch.
    RematchRequested,
}

impl Frame {
    /// The wire value of the `type` discriminator, for logging.
    #[must_use]
    pub fn kind(&self) -> &'static str {
        match self {
            Frame::Chat { .. } => "chat",
            Frame::Typing => "typing",
            Frame::EndChat => "endChat",
            Frame::MatchEnded => "matchEnded",
            Frame::RematchRequested => "rematchRequested",
        }
    }
}

/// Encode a frame into its JSON wire representation.
///
/// # Errors
///
/// Returns [`CodecError::Encode`] if serialization fails. In practice this
/// cannot happen for [`Frame`] values, but the transport layer treats it the
/// same as any other dropped frame.
pub fn encode(frame: &Frame) -> Result<String, CodecError> {
    serde_json::to_string(frame).map_err(CodecError::Encode)
}

/// Decode one JSON envelope into a frame.
///
/// # Errors
///
/// Returns [`CodecError::Malformed`] for invalid JSON, a missing or
/// unrecognized `type` tag, or missing variant fields.
pub fn decode(text: &str) -> Result<Frame, CodecError> {
    serde_json::from_str(text).map_err(CodecError::Malformed)
}

#[cfg(test)]
#[path = "frame_test.rs"]
mod tests;

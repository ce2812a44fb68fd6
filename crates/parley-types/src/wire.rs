//! JSON text frames exchanged over a persistent duplex connection.
//!
//! Every frame carries a `kind` discriminator. Peers send `turn` frames; the
//! relay answers with `session`, `partial`, `final` and `error` frames.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

/// Frame sent by the relay to a connected peer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ServerFrame {
    /// Sent once per connection, before any turn is handled.
    Session { session_id: String },
    /// One streamed chunk of the assistant reply.
    Partial { content: String, session_id: String },
    /// The complete assistant reply. Exactly one per accepted turn.
    Final { content: String, session_id: String },
    /// Malformed input or a storage failure; `message` is a short code.
    Error { message: String, session_id: String },
}

impl ServerFrame {
    pub fn to_json(&self) -> String {
        // Serializing a string-only enum cannot fail.
        serde_json::to_string(self).unwrap_or_default()
    }
}

fn default_stream() -> bool {
    true
}

/// A `turn` frame sent by a peer.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TurnRequest {
    pub content: String,
    #[serde(default)]
    pub session_id: Option<String>,
    /// `Some("")` clears the stored prompt; absent or `null` leaves it alone.
    #[serde(default)]
    pub system_prompt: Option<String>,
    #[serde(default = "default_stream")]
    pub stream: bool,
}

/// Why an inbound frame was rejected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    InvalidJson,
    UnknownKind,
    InvalidTurn,
}

impl FrameError {
    pub fn code(&self) -> &'static str {
        match self {
            FrameError::InvalidJson => "invalid_json",
            FrameError::UnknownKind => "unknown_kind",
            FrameError::InvalidTurn => "invalid_turn",
        }
    }
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

/// Parse one inbound text frame.
pub fn parse_client_frame(text: &str) -> Result<TurnRequest, FrameError> {
    let value: Value = serde_json::from_str(text).map_err(|_| FrameError::InvalidJson)?;
    match value.get("kind").and_then(Value::as_str) {
        Some("turn") => serde_json::from_value(value).map_err(|_| FrameError::InvalidTurn),
        _ => Err(FrameError::UnknownKind),
    }
}

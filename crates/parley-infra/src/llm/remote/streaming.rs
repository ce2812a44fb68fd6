//! Server-sent event decoding for streamed chat completions.
//!
//! The body arrives as arbitrary byte chunks. Lines (LF or CRLF) are
//! reassembled across chunks, then each `data:` line is decoded:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//! data: [DONE]
//! ```
//!
//! Anything else (comments, `event:` lines, blank keep-alives, malformed
//! JSON, deltas without content) is skipped.

use std::time::Duration;

use futures_util::{Stream, StreamExt};

use parley_core::gateway::ChunkStream;
use parley_types::error::ModelError;

use super::types::extract_delta_content;

/// Reassembles complete lines from a byte stream.
#[derive(Debug, Default)]
pub struct LineBuffer {
    pending: Vec<u8>,
}

impl LineBuffer {
    /// Append bytes and return every line they complete, without terminators.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<String> {
        self.pending.extend_from_slice(bytes);

        let mut lines = Vec::new();
        while let Some(pos) = self.pending.iter().position(|&b| b == b'\n') {
            let mut line: Vec<u8> = self.pending.drain(..=pos).collect();
            line.pop();
            if line.last() == Some(&b'\r') {
                line.pop();
            }
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
        lines
    }

    /// Whatever is left once the body ends without a trailing newline.
    pub fn finish(&mut self) -> Option<String> {
        if self.pending.is_empty() {
            return None;
        }
        let rest = std::mem::take(&mut self.pending);
        Some(String::from_utf8_lossy(&rest).into_owned())
    }
}

/// Meaning of one event-stream line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventLine {
    Chunk(String),
    Done,
    Skip,
}

pub fn parse_event_line(line: &str) -> EventLine {
    let Some(payload) = line.trim().strip_prefix("data:") else {
        return EventLine::Skip;
    };
    let payload = payload.trim();
    if payload == "[DONE]" {
        return EventLine::Done;
    }

    match serde_json::from_str::<serde_json::Value>(payload) {
        Ok(event) => match extract_delta_content(&event) {
            Some(text) => EventLine::Chunk(text.to_string()),
            None => EventLine::Skip,
        },
        Err(err) => {
            tracing::debug!("Skipping malformed event payload: {err}");
            EventLine::Skip
        }
    }
}

/// Decode a streamed response body into reply chunks.
///
/// Ends at `[DONE]` or at end of body. A read failure mid-body, or no bytes
/// for `idle_timeout`, yields `NetworkFailure` and ends the stream.
pub fn decode_event_stream<S, B, E>(body: S, idle_timeout: Duration) -> ChunkStream
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::try_stream! {
        let mut body = Box::pin(body);
        let mut lines = LineBuffer::default();
        let mut done = false;

        while !done {
            let next = tokio::time::timeout(idle_timeout, body.next())
                .await
                .map_err(|_| ModelError::NetworkFailure(format!("no data from upstream for {idle_timeout:?}")))?;
            let Some(piece) = next else {
                break;
            };
            let piece = piece.map_err(|e| ModelError::NetworkFailure(format!("response body read: {e}")))?;

            for line in lines.push(piece.as_ref()) {
                match parse_event_line(&line) {
                    EventLine::Chunk(text) => {
                        yield text;
                    }
                    EventLine::Done => {
                        done = true;
                        break;
                    }
                    EventLine::Skip => {}
                }
            }
        }

        if !done {
            if let Some(line) = lines.finish() {
                if let EventLine::Chunk(text) = parse_event_line(&line) {
                    yield text;
                }
            }
        }
    })
}

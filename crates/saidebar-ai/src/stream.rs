//! Server-sent event framing for the Messages API
//!
//! The body arrives as arbitrarily chunked bytes. [`FrameDecoder`] carries the
//! unterminated tail of the byte stream between chunks and only hands complete
//! lines to [`decode_line`], so the decoded event sequence does not depend on
//! where the transport happened to split the body.

use crate::error::{Error, Result};
use crate::http::ByteStream;
use async_stream::stream;
use futures::StreamExt;
use serde::Deserialize;
use std::pin::Pin;
use tokio_stream::Stream;

/// Prefix of a data frame
const DATA_PREFIX: &str = "data: ";
/// No-op end marker some servers send
const DONE_SENTINEL: &str = "[DONE]";

/// A recognized protocol event
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StreamEvent {
    /// A fragment of assistant text
    TextDelta(String),
    /// The server finished the message
    MessageStop,
    /// The server reported a failure mid-stream
    Error(String),
}

/// Result of decoding one complete line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FrameOutcome {
    /// A recognized event
    Event(StreamEvent),
    /// The `[DONE]` sentinel
    Done,
    /// Not a data frame, or an event kind we do not act on
    Ignored,
    /// A data frame whose payload failed to parse. Never fatal.
    Malformed(String),
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawEvent {
    ContentBlockDelta {
        delta: RawDelta,
    },
    MessageStop,
    Error {
        #[serde(default)]
        error: Option<RawError>,
    },
    #[serde(other)]
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum RawDelta {
    TextDelta {
        #[serde(default)]
        text: String,
    },
    #[serde(other)]
    Other,
}

#[derive(Deserialize)]
struct RawError {
    #[serde(default)]
    message: Option<String>,
}

/// Decode one complete line of the event stream
pub fn decode_line(line: &str) -> FrameOutcome {
    let Some(payload) = line.strip_prefix(DATA_PREFIX) else {
        // `event:` lines, comments and blank separators
        return FrameOutcome::Ignored;
    };
    if payload == DONE_SENTINEL {
        return FrameOutcome::Done;
    }

    match serde_json::from_str::<RawEvent>(payload) {
        Ok(RawEvent::ContentBlockDelta {
            delta: RawDelta::TextDelta { text },
        }) => {
            if text.is_empty() {
                FrameOutcome::Ignored
            } else {
                FrameOutcome::Event(StreamEvent::TextDelta(text))
            }
        }
        Ok(RawEvent::ContentBlockDelta {
            delta: RawDelta::Other,
        }) => FrameOutcome::Ignored,
        Ok(RawEvent::MessageStop) => FrameOutcome::Event(StreamEvent::MessageStop),
        Ok(RawEvent::Error { error }) => {
            let message = error
                .and_then(|e| e.message)
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Stream error".to_string());
            FrameOutcome::Event(StreamEvent::Error(message))
        }
        Ok(RawEvent::Unknown) => FrameOutcome::Ignored,
        Err(_) => FrameOutcome::Malformed(payload.to_string()),
    }
}

/// Incremental line framer over raw body bytes
#[derive(Debug, Default)]
pub struct FrameDecoder {
    /// Bytes after the last newline seen so far
    buffer: Vec<u8>,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one chunk and return the events completed by it, in order
    pub fn push(&mut self, chunk: &[u8]) -> Vec<StreamEvent> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        let mut start = 0;
        while let Some(pos) = self.buffer[start..].iter().position(|&b| b == b'\n') {
            let end = start + pos;
            handle_line(&self.buffer[start..end], &mut events);
            start = end + 1;
        }
        self.buffer.drain(..start);
        events
    }

    /// Flush an unterminated final line once the body has ended
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();
        if !self.buffer.is_empty() {
            let rest = std::mem::take(&mut self.buffer);
            handle_line(&rest, &mut events);
        }
        events
    }

    /// The carried-over partial line
    pub fn pending(&self) -> &[u8] {
        &self.buffer
    }
}

fn handle_line(raw: &[u8], events: &mut Vec<StreamEvent>) {
    let raw = raw.strip_suffix(b"\r").unwrap_or(raw);
    let line = String::from_utf8_lossy(raw);
    match decode_line(&line) {
        FrameOutcome::Event(event) => events.push(event),
        FrameOutcome::Done | FrameOutcome::Ignored => {}
        FrameOutcome::Malformed(payload) => {
            if !payload.trim().is_empty() {
                tracing::warn!("Failed to parse SSE data: {}", payload);
            }
        }
    }
}

/// A stream of decoded protocol events
pub type StreamEventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent>> + Send>>;

/// Decode a raw body into protocol events.
///
/// Transport errors are forwarded and end the stream.
pub fn decode_events(mut body: ByteStream) -> StreamEventStream {
    Box::pin(stream! {
        let mut decoder = FrameDecoder::new();
        while let Some(chunk) = body.next().await {
            match chunk {
                Ok(bytes) => {
                    for event in decoder.push(&bytes) {
                        yield Ok(event);
                    }
                }
                Err(e) => {
                    yield Err(match e {
                        Error::Http(e) => Error::Transport(e.to_string()),
                        other => other,
                    });
                    return;
                }
            }
        }
        for event in decoder.finish() {
            yield Ok(event);
        }
    })
}

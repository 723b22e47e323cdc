//! Incremental Server-Sent Events decoder
//!
//! The model provider answers streaming requests with a `text/event-stream` body.
//! This module turns the raw byte stream into [`SseFrame`]s:
//!
//! ```text
//! data: {"id":"chatcmpl-1","choices":[{"delta":{"content":"Hi"}}]}
//!
//! data: [DONE]
//! ```
//!
//! The decoder:
//! 1. Buffers incoming bytes (multi-byte characters may be split across chunks)
//! 2. Scans for frame boundaries (blank line)
//! 3. Collects `event:`, `id:` and `data:` fields, joining multi-line data with `\n`
//! 4. Skips comment lines and frames without data

use bytes::Bytes;
use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;
use thiserror::Error;

/// A boxed byte stream as returned by `reqwest::Response::bytes_stream`
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Bytes, reqwest::Error>> + Send>>;

/// A boxed stream of decoded frames
pub type FrameStream = Pin<Box<dyn Stream<Item = Result<SseFrame, EventStreamError>> + Send>>;

/// Errors raised while decoding an event stream
#[derive(Debug, Error)]
pub enum EventStreamError {
    /// The underlying connection failed mid-stream
    #[error("event stream transport error: {0}")]
    Transport(String),

    /// A complete frame was not valid UTF-8
    #[error("invalid UTF-8 in event stream: {0}")]
    InvalidUtf8(String),
}

/// One decoded SSE frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SseFrame {
    /// Value of the `event:` field, if any
    pub event: Option<String>,
    /// Value of the `id:` field, if any
    pub id: Option<String>,
    /// Data lines joined with `\n`
    pub data: String,
}

/// Decode a byte stream into SSE frames
pub fn decode_event_stream(byte_stream: ByteStream) -> FrameStream {
    let mut buffer: Vec<u8> = Vec::new();

    let frames = byte_stream.flat_map(move |chunk_result| {
        let chunk = match chunk_result {
            Ok(bytes) => bytes,
            Err(e) => {
                return futures::stream::iter(vec![Err(EventStreamError::Transport(
                    e.to_string(),
                ))]);
            }
        };

        // Carriage returns are dropped so `\r\n\r\n` and `\n\n` delimit alike
        buffer.extend(chunk.iter().copied().filter(|b| *b != b'\r'));

        let mut frames = Vec::new();
        while let Some(end) = find_boundary(&buffer) {
            let raw: Vec<u8> = buffer.drain(..end + 2).collect();
            match std::str::from_utf8(&raw[..end]) {
                Ok(text) => {
                    if let Some(frame) = parse_frame(text) {
                        frames.push(Ok(frame));
                    }
                }
                Err(e) => frames.push(Err(EventStreamError::InvalidUtf8(e.to_string()))),
            }
        }

        futures::stream::iter(frames)
    });

    Box::pin(frames)
}

fn find_boundary(buffer: &[u8]) -> Option<usize> {
    buffer.windows(2).position(|window| window == b"\n\n")
}

/// Parse a single frame from its text representation
fn parse_frame(text: &str) -> Option<SseFrame> {
    let mut frame = SseFrame::default();
    let mut data_lines: Vec<&str> = Vec::new();

    for line in text.lines() {
        if line.is_empty() || line.starts_with(':') {
            continue;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };

        match field {
            "event" => frame.event = Some(value.to_string()),
            "id" => frame.id = Some(value.to_string()),
            "data" => data_lines.push(value),
            _ => {}
        }
    }

    if data_lines.is_empty() {
        return None;
    }

    frame.data = data_lines.join("\n");
    Some(frame)
}

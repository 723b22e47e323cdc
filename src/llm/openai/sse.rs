//! Server-Sent Events (SSE) parser for OpenAI responses

use futures::stream::Stream;
use futures::StreamExt;
use std::pin::Pin;

use crate::event_stream::{decode_event_stream, ByteStream, SseFrame};
use crate::llm::core::error::LlmError;

use super::types::{ChatCompletionChunk, OpenAiErrorEnvelope};

/// Item of the parsed OpenAI stream
#[derive(Debug, Clone)]
pub enum OpenAiStreamItem {
    /// One completion chunk
    Chunk(ChatCompletionChunk),
    /// The `[DONE]` sentinel
    Done,
}

/// Parse a stream of bytes as OpenAI completion chunks
///
/// OpenAI's SSE format uses unnamed events:
/// ```text
/// data: {"id":"chatcmpl-1","choices":[{"delta":{"content":"Hi"}}]}
///
/// data: [DONE]
/// ```
///
/// An `{"error":{...}}` frame becomes [`LlmError::ProviderError`].
pub fn parse_sse_stream(
    byte_stream: ByteStream,
) -> Pin<Box<dyn Stream<Item = Result<OpenAiStreamItem, LlmError>> + Send>> {
    let items = decode_event_stream(byte_stream).filter_map(|frame_result| {
        let item = match frame_result {
            Ok(frame) => parse_frame(&frame),
            Err(e) => Some(Err(LlmError::from(e))),
        };
        futures::future::ready(item)
    });

    Box::pin(items)
}

/// Parse a single frame's data
fn parse_frame(frame: &SseFrame) -> Option<Result<OpenAiStreamItem, LlmError>> {
    let data = frame.data.trim();

    if data.is_empty() {
        return None;
    }

    if data == "[DONE]" {
        return Some(Ok(OpenAiStreamItem::Done));
    }

    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            return Some(Err(LlmError::SerializationError(format!(
                "Failed to parse OpenAI SSE event: {}. Data: {}",
                e, data
            ))))
        }
    };

    if value.get("error").is_some() {
        return Some(match serde_json::from_value::<OpenAiErrorEnvelope>(value) {
            Ok(envelope) => Err(LlmError::ProviderError {
                code: envelope.error.code(),
                message: envelope.error.message,
            }),
            Err(e) => Err(LlmError::SerializationError(e.to_string())),
        });
    }

    Some(
        serde_json::from_value::<ChatCompletionChunk>(value)
            .map(OpenAiStreamItem::Chunk)
            .map_err(LlmError::from),
    )
}

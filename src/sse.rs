use serde::Serialize;
use serde_json::Value;
use std::convert::Infallible;
use warp::sse::Event;

use crate::llm::core::types::FinishReason;
use crate::models::{AgentTextChunk, DoneEvent, ToolCallEvent, ToolErrorEvent, ToolResponseEvent};

fn named_event(name: &str, payload: &impl Serialize) -> Result<Event, Infallible> {
    // Payloads are plain structs of strings and JSON values
    let data = serde_json::to_string(payload).unwrap_or_else(|_| "{}".to_string());
    Ok(Event::default().event(name).data(data))
}

/// Create an agent_text SSE event with an ID and text chunk
pub fn create_agent_text_event(id: String, chunk: String) -> Result<Event, Infallible> {
    named_event("agent_text", &AgentTextChunk { id, chunk })
}

/// Create a tool_call SSE event
pub fn create_tool_call_event(
    id: String,
    tool_name: String,
    arguments: Value,
) -> Result<Event, Infallible> {
    named_event(
        "tool_call",
        &ToolCallEvent {
            id,
            tool_name,
            arguments,
        },
    )
}

/// Create a tool_response SSE event
pub fn create_tool_response_event(
    id: String,
    tool_call_id: String,
    result: Value,
) -> Result<Event, Infallible> {
    named_event(
        "tool_response",
        &ToolResponseEvent {
            id,
            tool_call_id,
            result,
        },
    )
}

/// Create a tool_error SSE event for an error the tool reported
pub fn create_tool_error_event(
    id: String,
    tool_call_id: String,
    error: String,
) -> Result<Event, Infallible> {
    named_event(
        "tool_error",
        &ToolErrorEvent {
            id,
            tool_call_id,
            error,
        },
    )
}

/// Create a done SSE event to signal normal completion
pub fn create_done_event(finish_reason: FinishReason, steps: usize) -> Result<Event, Infallible> {
    named_event(
        "done",
        &DoneEvent {
            finish_reason,
            steps,
        },
    )
}

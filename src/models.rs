// Request and response bodies of the HTTP API

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::conversation::ChatMessage;
use crate::llm::core::types::FinishReason;
use crate::llm::generation::ToolCallRecord;

// Request Types
/// Body of both endpoints; either field may be missing or malformed
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ChatRequest {
    #[serde(default)]
    pub messages: Value,
    #[serde(default)]
    pub message: Value,
}

impl ChatRequest {
    pub fn from_slice(body: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(body)
    }
}

// Single-shot Response
#[derive(Debug, Clone, Serialize)]
pub struct CompletionResponse {
    pub content: String,
    pub markdown: bool,
    #[serde(rename = "toolCalls")]
    pub tool_calls: Vec<ToolCallRecord>,
    /// The normalized conversation the model saw
    pub messages: Vec<ChatMessage>,
}

// SSE Event Types
#[derive(Debug, Clone, Serialize)]
pub struct AgentTextChunk {
    pub id: String,
    pub chunk: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolCallEvent {
    pub id: String,
    pub tool_name: String,
    pub arguments: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolResponseEvent {
    pub id: String,
    pub tool_call_id: String,
    pub result: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolErrorEvent {
    pub id: String,
    pub tool_call_id: String,
    pub error: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct DoneEvent {
    pub finish_reason: FinishReason,
    pub steps: usize,
}

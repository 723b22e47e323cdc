use crate::llm::core::error::LlmError;
use crate::llm::tools::ToolError;

/// Errors that can occur during agent execution
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Error from the LLM provider
    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    /// Failed to parse tool input JSON
    #[error("Failed to parse tool input: {0}")]
    ToolInputParse(#[from] serde_json::Error),

    /// A tool could not be executed
    #[error("Tool execution failed: {0}")]
    Tool(#[from] ToolError),

    /// LLM stream ended before the message was complete
    #[error("Stream ended unexpectedly")]
    UnexpectedStreamEnd,
}

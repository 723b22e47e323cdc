//! Tool executor trait

use async_trait::async_trait;
use thiserror::Error;

/// Ways a tool call can go wrong
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ToolError {
    /// The tool ran and reported an error result; the model gets to see it
    #[error("{0}")]
    Reported(String),

    /// The tool could not be executed at all; generation is aborted
    #[error("tool '{name}' failed: {message}")]
    Failed { name: String, message: String },
}

/// Trait for executing tool calls from the LLM
///
/// Implementations handle the actual execution of tools requested by the LLM. The
/// trait accepts the tool use ID, function name, and arguments as a JSON value, and
/// returns the rendered result text.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    /// Execute a tool call
    ///
    /// # Arguments
    ///
    /// * `tool_use_id` - Unique identifier for this tool invocation
    /// * `name` - Name of the tool to execute
    /// * `arguments` - Tool arguments as a JSON value
    async fn execute(
        &self,
        tool_use_id: String,
        name: String,
        arguments: serde_json::Value,
    ) -> Result<String, ToolError>;
}

//! Streaming and single-shot generation on top of the agent loop

use futures::StreamExt;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::llm::agent::{Agent, AgentError, AgentEvent, AgentStream, DEFAULT_MAX_STEPS};
use crate::llm::core::{
    config::GenerationConfig,
    provider::LlmProvider,
    types::{
        ContentBlockStart, ContentDelta, FinishReason, Message, StreamEvent, ToolDeclaration,
        UsageMetadata,
    },
};
use crate::llm::tools::ToolExecutor;

/// A tool invocation made during generation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename = "tool-call", rename_all = "camelCase")]
pub struct ToolCallRecord {
    pub tool_call_id: String,
    pub tool_name: String,
    pub args: serde_json::Value,
}

/// Outcome of a single-shot generation
#[derive(Debug, Clone, PartialEq)]
pub struct Generation {
    /// Text produced by the final step
    pub text: String,
    /// Tool calls of every step, in order
    pub tool_calls: Vec<ToolCallRecord>,
    pub finish_reason: FinishReason,
    pub steps: usize,
    /// Usage summed over all steps
    pub usage: UsageMetadata,
}

/// Runs conversations against one provider with fixed generation settings
#[derive(Clone)]
pub struct Generator {
    provider: Arc<dyn LlmProvider>,
    config: GenerationConfig,
    max_steps: usize,
}

impl Generator {
    pub fn new(provider: Arc<dyn LlmProvider>, config: GenerationConfig) -> Self {
        Self {
            provider,
            config,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    pub fn with_max_steps(mut self, max_steps: usize) -> Self {
        self.max_steps = max_steps.max(1);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Start a streamed generation; nothing is buffered
    pub fn stream(
        &self,
        messages: Vec<Message>,
        executor: Arc<dyn ToolExecutor>,
        declarations: Vec<ToolDeclaration>,
    ) -> AgentStream {
        Agent::new(self.provider.clone(), executor, declarations, self.config.clone())
            .with_max_steps(self.max_steps)
            .run(messages)
    }

    /// Run to completion and collect the final answer
    pub async fn generate(
        &self,
        messages: Vec<Message>,
        executor: Arc<dyn ToolExecutor>,
        declarations: Vec<ToolDeclaration>,
    ) -> Result<Generation, AgentError> {
        let mut events = self.stream(messages, executor, declarations);

        let mut step_text = String::new();
        let mut tool_calls = Vec::new();
        let mut usage = UsageMetadata::default();

        while let Some(event) = events.next().await {
            match event? {
                AgentEvent::StepStarted { .. } => step_text.clear(),
                AgentEvent::LlmEvent(StreamEvent::ContentBlockStart {
                    block: ContentBlockStart::Text { text },
                    ..
                })
                | AgentEvent::LlmEvent(StreamEvent::ContentDelta {
                    delta: ContentDelta::TextDelta { text },
                    ..
                }) => step_text.push_str(&text),
                AgentEvent::ToolExecutionStarted {
                    tool_use_id,
                    name,
                    input,
                } => tool_calls.push(ToolCallRecord {
                    tool_call_id: tool_use_id,
                    tool_name: name,
                    args: input,
                }),
                AgentEvent::StepFinished { usage: step_usage, .. } => usage.add(&step_usage),
                AgentEvent::Completed {
                    finish_reason,
                    steps,
                } => {
                    return Ok(Generation {
                        text: step_text,
                        tool_calls,
                        finish_reason,
                        steps,
                        usage,
                    });
                }
                _ => {}
            }
        }

        Err(AgentError::UnexpectedStreamEnd)
    }
}

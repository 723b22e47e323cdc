//! Tool-using generation loop
//!
//! The agent:
//! - Calls the LLM with the conversation so far and streams all responses
//! - Executes the tool calls the model makes and appends the results
//! - Repeats until the model answers without tool calls or the step ceiling is hit
//! - Returns one stream of events covering every step

mod error;

pub use error::AgentError;

use crate::llm::core::{
    config::GenerationConfig,
    provider::LlmProvider,
    types::{
        ContentBlock, ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message,
        MessageRole, StreamEvent, ToolDeclaration, UsageMetadata,
    },
};
use crate::llm::tools::{ToolError, ToolExecutor};
use async_stream::stream;
use futures::stream::Stream;
use futures::StreamExt;
use pin_utils::pin_mut;
use std::pin::Pin;
use std::sync::Arc;

/// Upper bound on model calls per request
pub const DEFAULT_MAX_STEPS: usize = 20;

/// Stream of agent events for one request
pub type AgentStream = Pin<Box<dyn Stream<Item = Result<AgentEvent, AgentError>> + Send>>;

/// Events emitted by the agent during execution
#[derive(Debug, Clone)]
pub enum AgentEvent {
    /// A new model call is about to be made
    StepStarted { step: usize },

    /// Raw LLM streaming event (text deltas, tool calls, etc.)
    LlmEvent(StreamEvent),

    /// Agent is executing a tool call
    ToolExecutionStarted {
        tool_use_id: String,
        name: String,
        input: serde_json::Value,
    },

    /// Tool execution completed successfully
    ToolExecutionCompleted {
        tool_use_id: String,
        name: String,
        result: String,
    },

    /// Tool reported an error; it is fed back to the model
    ToolExecutionFailed {
        tool_use_id: String,
        name: String,
        error: String,
    },

    /// The model call of a step finished
    StepFinished {
        step: usize,
        finish_reason: FinishReason,
        usage: UsageMetadata,
    },

    /// Agent loop completed
    Completed {
        finish_reason: FinishReason,
        steps: usize,
    },
}

/// Helper struct for accumulating partial tool use data
struct PartialToolUseAccumulator {
    id: String,
    name: String,
    input: String,
}

/// Agent that runs one conversation through the model and its tools
pub struct Agent {
    /// LLM provider
    provider: Arc<dyn LlmProvider>,

    /// Tool executor for handling function calls
    tool_executor: Arc<dyn ToolExecutor>,

    /// Tool declarations available to the LLM
    tool_declarations: Vec<ToolDeclaration>,

    /// Generation configuration (temperature, max_tokens, etc.)
    config: GenerationConfig,

    /// Maximum number of model calls (default: 20)
    max_steps: usize,
}

impl Agent {
    /// Create a new agent with default settings
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tool_executor: Arc<dyn ToolExecutor>,
        tool_declarations: Vec<ToolDeclaration>,
        config: GenerationConfig,
    ) -> Self {
        Self {
            provider,
            tool_executor,
            tool_declarations,
            config,
            max_steps: DEFAULT_MAX_STEPS,
        }
    }

    /// Set the maximum number of steps (at least one)
    pub fn with_max_steps(mut self, max: usize) -> Self {
        self.max_steps = max.max(1);
        self
    }

    pub fn max_steps(&self) -> usize {
        self.max_steps
    }

    /// Run the loop over an already normalized conversation
    ///
    /// The returned stream emits, per step:
    /// - `StepStarted`
    /// - `LlmEvent` for every provider event
    /// - `StepFinished` once the provider message ends
    /// - `ToolExecution*` for each tool call
    ///
    /// and a final `Completed`. Any `Err` item is terminal.
    pub fn run(self, history: Vec<Message>) -> AgentStream {
        Box::pin(self.into_stream(history))
    }

    fn into_stream(
        self,
        mut messages: Vec<Message>,
    ) -> impl Stream<Item = Result<AgentEvent, AgentError>> + Send + 'static {
        let Agent {
            provider,
            tool_executor,
            tool_declarations,
            config,
            max_steps,
        } = self;

        let tools = if tool_declarations.is_empty() {
            None
        } else {
            Some(tool_declarations)
        };

        stream! {
            for step in 1..=max_steps {
                yield Ok(AgentEvent::StepStarted { step });

                let request = GenerateRequest {
                    messages: messages.clone(),
                    tools: tools.clone(),
                    config: config.clone(),
                };

                let llm_stream = match provider.stream_generate(request).await {
                    Ok(s) => s,
                    Err(e) => {
                        yield Err(AgentError::Llm(e));
                        return;
                    }
                };

                // Forward events while accumulating text and tool calls
                let mut text_content = String::new();
                let mut tool_uses = Vec::new();
                let mut current_tool_use: Option<PartialToolUseAccumulator> = None;
                let mut finish: Option<(FinishReason, UsageMetadata)> = None;

                pin_mut!(llm_stream);

                while let Some(event_result) = llm_stream.next().await {
                    let event = match event_result {
                        Ok(e) => e,
                        Err(e) => {
                            yield Err(AgentError::Llm(e));
                            return;
                        }
                    };

                    yield Ok(AgentEvent::LlmEvent(event.clone()));

                    match event {
                        StreamEvent::ContentBlockStart { block, .. } => match block {
                            ContentBlockStart::Text { text } => text_content.push_str(&text),
                            ContentBlockStart::ToolUse { id, name } => {
                                current_tool_use = Some(PartialToolUseAccumulator {
                                    id,
                                    name,
                                    input: String::new(),
                                });
                            }
                        },
                        StreamEvent::ContentDelta { delta, .. } => match delta {
                            ContentDelta::TextDelta { text } => text_content.push_str(&text),
                            ContentDelta::ToolUseDelta { partial } => {
                                if let Some(tool_use) = &mut current_tool_use {
                                    tool_use.input.push_str(&partial.partial_json);
                                }
                            }
                        },
                        StreamEvent::ContentBlockEnd { .. } => {
                            if let Some(tool_use) = current_tool_use.take() {
                                match parse_tool_input(&tool_use.input) {
                                    Ok(input) => tool_uses.push(ContentBlock::ToolUse {
                                        id: tool_use.id,
                                        name: tool_use.name,
                                        input,
                                    }),
                                    Err(e) => {
                                        yield Err(AgentError::ToolInputParse(e));
                                        return;
                                    }
                                }
                            }
                        }
                        StreamEvent::MessageEnd { finish_reason, usage } => {
                            finish = Some((finish_reason, usage));
                            break;
                        }
                        _ => {}
                    }
                }

                let Some((finish_reason, usage)) = finish else {
                    yield Err(AgentError::UnexpectedStreamEnd);
                    return;
                };

                let mut assistant_content = Vec::new();
                if !text_content.is_empty() {
                    assistant_content.push(ContentBlock::Text { text: text_content });
                }
                assistant_content.extend(tool_uses.iter().cloned());
                messages.push(Message {
                    role: MessageRole::Assistant,
                    content: assistant_content,
                });

                yield Ok(AgentEvent::StepFinished {
                    step,
                    finish_reason: finish_reason.clone(),
                    usage,
                });

                if tool_uses.is_empty() {
                    yield Ok(AgentEvent::Completed { finish_reason, steps: step });
                    return;
                }

                for block in tool_uses {
                    let ContentBlock::ToolUse { id, name, input } = block else {
                        continue;
                    };

                    yield Ok(AgentEvent::ToolExecutionStarted {
                        tool_use_id: id.clone(),
                        name: name.clone(),
                        input: input.clone(),
                    });

                    match tool_executor.execute(id.clone(), name.clone(), input).await {
                        Ok(result) => {
                            yield Ok(AgentEvent::ToolExecutionCompleted {
                                tool_use_id: id.clone(),
                                name,
                                result: result.clone(),
                            });
                            messages.push(Message::tool_result(id, result));
                        }
                        Err(ToolError::Reported(error)) => {
                            yield Ok(AgentEvent::ToolExecutionFailed {
                                tool_use_id: id.clone(),
                                name,
                                error: error.clone(),
                            });
                            messages.push(Message::tool_error(id, error));
                        }
                        Err(failure) => {
                            yield Err(AgentError::Tool(failure));
                            return;
                        }
                    }
                }
            }

            tracing::warn!(max_steps, "step ceiling reached, ending generation");
            yield Ok(AgentEvent::Completed {
                finish_reason: FinishReason::StepLimit,
                steps: max_steps,
            });
        }
    }
}

/// Tool arguments as accumulated from the stream; no-argument calls may send nothing
fn parse_tool_input(raw: &str) -> Result<serde_json::Value, serde_json::Error> {
    if raw.trim().is_empty() {
        return Ok(serde_json::Value::Object(serde_json::Map::new()));
    }
    serde_json::from_str(raw)
}

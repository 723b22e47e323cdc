//! Mapping between abstraction types and OpenAI-specific types

use std::collections::BTreeMap;

use crate::llm::core::types::{
    ContentBlock, ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message,
    MessageMetadata, MessageRole, PartialToolUse, StreamEvent, ToolDeclaration, UsageMetadata,
};

use super::types::{
    ChatCompletionChunk, ChatCompletionMessage, ChatCompletionRequest, OpenAiFunction,
    OpenAiFunctionCall, OpenAiTool, OpenAiToolCall, StreamOptions,
};

/// Convert our abstraction request to OpenAI's request format
pub fn to_openai_request(request: GenerateRequest, model: &str) -> ChatCompletionRequest {
    let tools: Option<Vec<OpenAiTool>> = request
        .tools
        .filter(|tools| !tools.is_empty())
        .map(|tools| tools.into_iter().map(to_openai_tool).collect());

    ChatCompletionRequest {
        model: model.to_string(),
        messages: request
            .messages
            .into_iter()
            .flat_map(to_openai_messages)
            .collect(),
        tool_choice: tools.as_ref().map(|_| "auto".to_string()),
        tools,
        max_tokens: request.config.max_tokens,
        temperature: request.config.temperature,
        top_p: request.config.top_p,
        stop: request.config.stop_sequences,
        stream: true,
        stream_options: StreamOptions {
            include_usage: true,
        },
    }
}

/// Convert one of our messages; a tool message carrying several results becomes
/// one OpenAI message per result
fn to_openai_messages(message: Message) -> Vec<ChatCompletionMessage> {
    match message.role {
        MessageRole::System => vec![ChatCompletionMessage::text("system", message.text_content())],
        MessageRole::User => vec![ChatCompletionMessage::text("user", message.text_content())],
        MessageRole::Assistant => vec![to_assistant_message(message)],
        MessageRole::Tool => message
            .content
            .into_iter()
            .filter_map(|block| match block {
                ContentBlock::ToolResult {
                    tool_use_id,
                    content,
                    is_error,
                } => Some(ChatCompletionMessage {
                    role: "tool".to_string(),
                    content: Some(if is_error {
                        format!("Error: {}", content)
                    } else {
                        content
                    }),
                    tool_calls: None,
                    tool_call_id: Some(tool_use_id),
                }),
                _ => None,
            })
            .collect(),
    }
}

fn to_assistant_message(message: Message) -> ChatCompletionMessage {
    let text = message.text_content();
    let tool_calls: Vec<OpenAiToolCall> = message
        .content
        .into_iter()
        .filter_map(|block| match block {
            ContentBlock::ToolUse { id, name, input } => Some(OpenAiToolCall {
                id,
                call_type: "function".to_string(),
                function: OpenAiFunctionCall {
                    name,
                    arguments: input.to_string(),
                },
            }),
            _ => None,
        })
        .collect();

    if tool_calls.is_empty() {
        return ChatCompletionMessage::text("assistant", text);
    }

    ChatCompletionMessage {
        role: "assistant".to_string(),
        content: if text.is_empty() { None } else { Some(text) },
        tool_calls: Some(tool_calls),
        tool_call_id: None,
    }
}

/// Convert our ToolDeclaration to OpenAI's function tool
fn to_openai_tool(tool: ToolDeclaration) -> OpenAiTool {
    OpenAiTool {
        tool_type: "function".to_string(),
        function: OpenAiFunction {
            name: tool.name,
            description: tool.description,
            parameters: tool.input_schema,
        },
    }
}

/// Map an OpenAI finish reason string
pub fn map_finish_reason(reason: &str) -> FinishReason {
    match reason {
        "stop" => FinishReason::Stop,
        "length" => FinishReason::MaxTokens,
        "tool_calls" | "function_call" => FinishReason::ToolUse,
        "content_filter" => FinishReason::Safety,
        other => FinishReason::Other(other.to_string()),
    }
}

/// A streamed tool call, assembled from deltas sharing one `index`
#[derive(Debug, Default)]
struct PendingToolCall {
    id: String,
    name: String,
    arguments: String,
}

/// Stateful translation of OpenAI chunks into our block-structured events
///
/// Text deltas are forwarded as they arrive inside a single text block. Tool call
/// deltas may interleave across calls and only the first delta of a call carries
/// its id and name, so calls are assembled by their `index` and emitted as
/// complete blocks, in index order, once the choice finishes. The finish reason is
/// held until the `[DONE]` sentinel so the trailing usage chunk can be folded into
/// [`StreamEvent::MessageEnd`].
#[derive(Debug, Default)]
pub struct ChunkMapper {
    message_started: bool,
    next_index: usize,
    open_text: Option<usize>,
    tool_calls: BTreeMap<usize, PendingToolCall>,
    finish_reason: Option<FinishReason>,
    usage: UsageMetadata,
    finished: bool,
}

impl ChunkMapper {
    pub fn new() -> Self {
        Self::default()
    }

    /// Convert one chunk; may yield zero or more events
    pub fn map_chunk(&mut self, chunk: ChatCompletionChunk) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }

        if !self.message_started {
            self.message_started = true;
            events.push(StreamEvent::MessageStart {
                message: MessageMetadata {
                    id: chunk.id.clone(),
                    role: MessageRole::Assistant,
                    usage: None,
                },
            });
        }

        // Only the first choice is requested
        for choice in chunk.choices.into_iter().filter(|c| c.index == 0) {
            if let Some(text) = choice.delta.content.filter(|t| !t.is_empty()) {
                let index = match self.open_text {
                    Some(index) => index,
                    None => {
                        let index = self.allocate_index();
                        self.open_text = Some(index);
                        events.push(StreamEvent::ContentBlockStart {
                            index,
                            block: ContentBlockStart::Text {
                                text: String::new(),
                            },
                        });
                        index
                    }
                };
                events.push(StreamEvent::ContentDelta {
                    index,
                    delta: ContentDelta::TextDelta { text },
                });
            }

            for call in choice.delta.tool_calls.unwrap_or_default() {
                self.close_text(&mut events);

                let function = call.function.unwrap_or_default();
                let pending = self.tool_calls.entry(call.index).or_default();
                if let Some(id) = call.id.filter(|id| !id.is_empty()) {
                    pending.id = id;
                }
                if let Some(name) = function.name.filter(|name| !name.is_empty()) {
                    pending.name = name;
                }
                if let Some(arguments) = function.arguments {
                    pending.arguments.push_str(&arguments);
                }
            }

            if let Some(reason) = choice.finish_reason {
                self.close_text(&mut events);
                self.flush_tool_calls(&mut events);
                self.finish_reason = Some(map_finish_reason(&reason));
            }
        }

        if let Some(usage) = chunk.usage {
            self.usage = UsageMetadata::new(usage.prompt_tokens, usage.completion_tokens);
            events.push(StreamEvent::MessageDelta {
                usage: Some(self.usage),
            });
        }

        events
    }

    /// Handle the `[DONE]` sentinel
    pub fn finish(&mut self) -> Vec<StreamEvent> {
        let mut events = Vec::new();

        if self.finished {
            return events;
        }
        self.finished = true;

        self.close_text(&mut events);
        self.flush_tool_calls(&mut events);
        events.push(StreamEvent::MessageEnd {
            finish_reason: self.finish_reason.take().unwrap_or(FinishReason::Stop),
            usage: self.usage,
        });
        events
    }

    fn allocate_index(&mut self) -> usize {
        let index = self.next_index;
        self.next_index += 1;
        index
    }

    fn close_text(&mut self, events: &mut Vec<StreamEvent>) {
        if let Some(index) = self.open_text.take() {
            events.push(StreamEvent::ContentBlockEnd { index });
        }
    }

    fn flush_tool_calls(&mut self, events: &mut Vec<StreamEvent>) {
        for (_, call) in std::mem::take(&mut self.tool_calls) {
            let index = self.allocate_index();
            events.push(StreamEvent::ContentBlockStart {
                index,
                block: ContentBlockStart::ToolUse {
                    id: call.id,
                    name: call.name,
                },
            });
            if !call.arguments.is_empty() {
                events.push(StreamEvent::ContentDelta {
                    index,
                    delta: ContentDelta::ToolUseDelta {
                        partial: PartialToolUse {
                            id: None,
                            name: None,
                            partial_json: call.arguments,
                        },
                    },
                });
            }
            events.push(StreamEvent::ContentBlockEnd { index });
        }
    }
}

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use toolrelay::llm::core::error::LlmError;
use toolrelay::llm::core::provider::{EventStream, LlmProvider};
use toolrelay::llm::core::types::{
    ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, MessageMetadata, MessageRole,
    PartialToolUse, StreamEvent, UsageMetadata,
};
use toolrelay::mcp::{
    CallToolResult, ConnectionConfig, McpError, RegistryEntry, RemoteTool, ServerConfig,
    ToolServerConnector, ToolServerSession,
};

/// Provider that replays one scripted response per call and records every request
#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<Vec<Vec<Result<StreamEvent, LlmError>>>>,
    pub requests: Mutex<Vec<GenerateRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<Vec<Result<StreamEvent, LlmError>>>) -> Self {
        Self {
            responses: Mutex::new(responses),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LlmProvider for ScriptedProvider {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.requests.lock().unwrap().push(request);

        let mut responses = self.responses.lock().unwrap();
        if responses.is_empty() {
            return Err(LlmError::HttpError {
                status: 503,
                body: "no scripted response left".to_string(),
            });
        }
        let events = responses.remove(0);
        Ok(Box::pin(futures::stream::iter(events)))
    }
}

fn message_start() -> Result<StreamEvent, LlmError> {
    Ok(StreamEvent::MessageStart {
        message: MessageMetadata {
            id: "msg".to_string(),
            role: MessageRole::Assistant,
            usage: None,
        },
    })
}

fn text_block(index: usize, text: &str) -> Vec<Result<StreamEvent, LlmError>> {
    vec![
        Ok(StreamEvent::ContentBlockStart {
            index,
            block: ContentBlockStart::Text {
                text: String::new(),
            },
        }),
        Ok(StreamEvent::ContentDelta {
            index,
            delta: ContentDelta::TextDelta {
                text: text.to_string(),
            },
        }),
        Ok(StreamEvent::ContentBlockEnd { index }),
    ]
}

/// One model turn that answers with plain text
pub fn text_turn(text: &str) -> Vec<Result<StreamEvent, LlmError>> {
    let mut events = vec![message_start()];
    events.extend(text_block(0, text));
    events.push(Ok(StreamEvent::MessageEnd {
        finish_reason: FinishReason::Stop,
        usage: UsageMetadata::new(12, 5),
    }));
    events
}

/// One model turn that calls a single tool
pub fn tool_turn(id: &str, name: &str, args: &str) -> Vec<Result<StreamEvent, LlmError>> {
    vec![
        message_start(),
        Ok(StreamEvent::ContentBlockStart {
            index: 0,
            block: ContentBlockStart::ToolUse {
                id: id.to_string(),
                name: name.to_string(),
            },
        }),
        Ok(StreamEvent::ContentDelta {
            index: 0,
            delta: ContentDelta::ToolUseDelta {
                partial: PartialToolUse {
                    id: None,
                    name: None,
                    partial_json: args.to_string(),
                },
            },
        }),
        Ok(StreamEvent::ContentBlockEnd { index: 0 }),
        Ok(StreamEvent::MessageEnd {
            finish_reason: FinishReason::ToolUse,
            usage: UsageMetadata::new(20, 8),
        }),
    ]
}

/// A turn that emits some text and then fails
pub fn failing_turn(partial: &str, message: &str) -> Vec<Result<StreamEvent, LlmError>> {
    let mut events = vec![message_start()];
    events.extend(text_block(0, partial).into_iter().take(2));
    events.push(Err(LlmError::StreamError(message.to_string())));
    events
}

pub fn remote_tool(name: &str) -> RemoteTool {
    RemoteTool {
        name: name.to_string(),
        description: Some(format!("{} tool", name)),
        input_schema: json!({
            "type": "object",
            "properties": { "query": { "type": "string" } }
        }),
    }
}

pub fn entry(name: &str, url: &str, enabled: bool) -> RegistryEntry {
    RegistryEntry::new(
        name,
        ServerConfig {
            url: url.to_string(),
            enabled,
            ..Default::default()
        },
    )
}

/// How a fake server behaves when the aggregator reaches it
#[derive(Clone)]
pub enum ServerBehavior {
    Tools(Vec<RemoteTool>),
    /// Answers `list_tools` only after the delay
    SlowTools(Duration, Vec<RemoteTool>),
    RefuseConnection,
    HangOnConnect,
    HangOnListTools,
    FailListTools,
}

/// Connector that serves in-process sessions keyed by entry name
#[derive(Default)]
pub struct FakeConnector {
    servers: HashMap<String, ServerBehavior>,
    pub seen: Mutex<Vec<ConnectionConfig>>,
    /// Server names in the order their tool listings completed
    pub listed: Arc<Mutex<Vec<String>>>,
}

impl FakeConnector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_server(mut self, name: &str, behavior: ServerBehavior) -> Self {
        self.servers.insert(name.to_string(), behavior);
        self
    }

    pub fn listing_order(&self) -> Vec<String> {
        self.listed.lock().unwrap().clone()
    }

    pub fn seen_urls(&self) -> Vec<String> {
        self.seen
            .lock()
            .unwrap()
            .iter()
            .map(|c| c.resolved_url())
            .collect()
    }
}

#[async_trait]
impl ToolServerConnector for FakeConnector {
    async fn connect(
        &self,
        config: ConnectionConfig,
    ) -> Result<Arc<dyn ToolServerSession>, McpError> {
        self.seen.lock().unwrap().push(config.clone());

        let behavior = self
            .servers
            .get(&config.name)
            .cloned()
            .unwrap_or(ServerBehavior::RefuseConnection);

        match behavior {
            ServerBehavior::RefuseConnection => {
                Err(McpError::Connect("HTTP status client error (404 Not Found)".to_string()))
            }
            ServerBehavior::HangOnConnect => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                Err(McpError::Connect("timed out".to_string()))
            }
            behavior => Ok(Arc::new(FakeSession {
                name: config.name,
                behavior,
                listed: self.listed.clone(),
            })),
        }
    }
}

pub struct FakeSession {
    name: String,
    behavior: ServerBehavior,
    listed: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl ToolServerSession for FakeSession {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        let tools = match &self.behavior {
            ServerBehavior::Tools(tools) => tools.clone(),
            ServerBehavior::SlowTools(delay, tools) => {
                tokio::time::sleep(*delay).await;
                tools.clone()
            }
            ServerBehavior::HangOnListTools => {
                tokio::time::sleep(Duration::from_secs(3600)).await;
                vec![]
            }
            _ => return Err(McpError::Service("tools unavailable".to_string())),
        };
        self.listed.lock().unwrap().push(self.name.clone());
        Ok(tools)
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        Ok(CallToolResult {
            content: vec![json!({
                "type": "text",
                "text": format!("{}@{} {}", name, self.name, arguments)
            })],
            ..Default::default()
        })
    }
}

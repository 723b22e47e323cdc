//! LLM Abstraction Layer
//!
//! This module provides a provider-neutral streaming interface, an OpenAI-compatible
//! implementation of it, and the tool-using generation loop built on top.

pub mod agent;
pub mod core;
pub mod generation;
pub mod openai;
pub mod tools;

// Re-export commonly used types
pub use core::{
    config::GenerationConfig,
    error::LlmError,
    provider::LlmProvider,
    types::{
        ContentBlock, ContentDelta, FinishReason, GenerateRequest, Message, MessageRole,
        StreamEvent, ToolDeclaration, UsageMetadata,
    },
};

pub use agent::{Agent, AgentError, AgentEvent};
pub use generation::{Generation, Generator, ToolCallRecord};
pub use openai::OpenAiClient;
pub use tools::{ToolError, ToolExecutor};

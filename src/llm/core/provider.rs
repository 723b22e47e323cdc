//! Provider trait for LLM implementations

use async_trait::async_trait;
use futures::stream::Stream;
use std::pin::Pin;

use super::{error::LlmError, types::{GenerateRequest, StreamEvent}};

/// Stream of provider-neutral events for one model call
pub type EventStream = Pin<Box<dyn Stream<Item = Result<StreamEvent, LlmError>> + Send>>;

/// Main interface that all LLM provider implementations must satisfy
#[async_trait]
pub trait LlmProvider: Send + Sync {
    /// Stream generate content from the LLM
    ///
    /// Sends one request and returns a stream of events describing the incremental
    /// response. A well-formed stream always ends with [`StreamEvent::MessageEnd`].
    ///
    /// # Arguments
    /// * `request` - The generation request with messages, tools, and config
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError>;
}

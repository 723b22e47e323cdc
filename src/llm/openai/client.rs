//! OpenAI client implementation

use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, StatusCode};

use crate::config::OpenAiConfig;
use crate::llm::core::{
    error::LlmError,
    provider::{EventStream, LlmProvider},
    types::{GenerateRequest, StreamEvent},
};

use super::mapper::{to_openai_request, ChunkMapper};
use super::sse::{parse_sse_stream, OpenAiStreamItem};
use super::types::OpenAiErrorEnvelope;

/// Client for the OpenAI Chat Completions API (or any compatible endpoint)
pub struct OpenAiClient {
    /// HTTP client for making requests
    http_client: Client,
    /// Bearer token
    api_key: String,
    /// API root, e.g. "https://api.openai.com/v1"
    base_url: String,
    /// Model to use
    model: String,
}

impl OpenAiClient {
    /// Create a new OpenAI client
    ///
    /// # Errors
    ///
    /// Returns an error if the API key is empty or the HTTP client cannot be built.
    pub fn new(config: &OpenAiConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::AuthenticationError(
                "OpenAI API key is empty".to_string(),
            ));
        }

        let http_client = Client::builder()
            .connect_timeout(std::time::Duration::from_secs(5))
            .build()
            .map_err(|e| LlmError::HttpError {
                status: 0,
                body: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            http_client,
            api_key: config.api_key.clone(),
            base_url: config.base_url.clone(),
            model: config.model.clone(),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Build the endpoint URL for streaming
    fn build_endpoint_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }

    /// Make a streaming request to OpenAI
    async fn make_streaming_request(
        &self,
        request: GenerateRequest,
    ) -> Result<EventStream, LlmError> {
        let openai_request = to_openai_request(request, &self.model);

        let url = self.build_endpoint_url();
        tracing::debug!(
            url = %url,
            model = %self.model,
            messages = openai_request.messages.len(),
            tools = openai_request.tools.as_ref().map(|t| t.len()).unwrap_or(0),
            "sending chat completion request"
        );

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("Content-Type", "application/json")
            .json(&openai_request)
            .send()
            .await?;

        // Check status
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_else(|_| String::new());
            return Err(error_from_status(status, body));
        }

        let sse_stream = parse_sse_stream(Box::pin(response.bytes_stream()));

        // Convert to StreamEvent stream
        let mut mapper = ChunkMapper::new();

        let event_stream = sse_stream.flat_map(move |result| {
            let events: Vec<Result<StreamEvent, LlmError>> = match result {
                Ok(OpenAiStreamItem::Chunk(chunk)) => {
                    mapper.map_chunk(chunk).into_iter().map(Ok).collect()
                }
                Ok(OpenAiStreamItem::Done) => mapper.finish().into_iter().map(Ok).collect(),
                Err(e) => vec![Err(e)],
            };
            futures::stream::iter(events)
        });

        Ok(Box::pin(event_stream))
    }
}

/// Turn a non-success response into an error, preferring the API's own message
fn error_from_status(status: StatusCode, body: String) -> LlmError {
    if status == StatusCode::UNAUTHORIZED {
        let message = serde_json::from_str::<OpenAiErrorEnvelope>(&body)
            .map(|envelope| envelope.error.message)
            .unwrap_or(body);
        return LlmError::AuthenticationError(message);
    }

    LlmError::HttpError {
        status: status.as_u16(),
        body,
    }
}

#[async_trait]
impl LlmProvider for OpenAiClient {
    async fn stream_generate(&self, request: GenerateRequest) -> Result<EventStream, LlmError> {
        self.make_streaming_request(request).await
    }
}

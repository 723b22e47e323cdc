// Per-process state shared by all requests

use std::sync::Arc;

use crate::config::AppConfig;
use crate::llm::core::error::LlmError;
use crate::llm::core::provider::LlmProvider;
use crate::llm::generation::Generator;
use crate::llm::openai::OpenAiClient;
use crate::mcp::{HttpSseConnector, Registry, ToolServerAggregator, ToolServerConnector};

#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<Registry>,
    pub aggregator: Arc<ToolServerAggregator>,
    pub generator: Generator,
}

impl AppState {
    pub fn new(
        registry: Registry,
        aggregator: ToolServerAggregator,
        generator: Generator,
    ) -> Self {
        Self {
            registry: Arc::new(registry),
            aggregator: Arc::new(aggregator),
            generator,
        }
    }

    /// Wire the OpenAI provider and the HTTP+SSE tool-server connector
    pub fn from_config(config: &AppConfig, registry: Registry) -> Result<Self, LlmError> {
        let provider: Arc<dyn LlmProvider> = Arc::new(OpenAiClient::new(&config.openai)?);
        let generator =
            Generator::new(provider, config.generation.clone()).with_max_steps(config.max_steps);

        let connector: Arc<dyn ToolServerConnector> = Arc::new(HttpSseConnector::default());
        let aggregator = ToolServerAggregator::new(connector, config.aggregator);

        Ok(Self::new(registry, aggregator, generator))
    }
}

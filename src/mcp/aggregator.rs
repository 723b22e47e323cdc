//! Multi-server tool aggregation
//!
//! Every enabled registry entry is attempted concurrently under two independent
//! ceilings: one for establishing the session, one for listing its tools. Results
//! are merged in registry order, so when two servers expose the same tool name the
//! later entry wins. A failing entry never fails the aggregation.

use async_trait::async_trait;
use futures::future::join_all;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

use super::error::McpError;
use super::types::{CallToolResult, RemoteTool};
use super::registry::{ConnectionConfig, Registry, RegistryEntry};
use super::toolset::ToolSet;

pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
pub const DEFAULT_TOOLS_TIMEOUT: Duration = Duration::from_secs(3);

/// Opens sessions with tool servers
#[async_trait]
pub trait ToolServerConnector: Send + Sync {
    async fn connect(
        &self,
        config: ConnectionConfig,
    ) -> Result<Arc<dyn ToolServerSession>, McpError>;
}

/// An established session with one tool server
#[async_trait]
pub trait ToolServerSession: Send + Sync {
    fn name(&self) -> &str;

    async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError>;

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AggregatorConfig {
    pub connect_timeout: Duration,
    pub tools_timeout: Duration,
}

impl Default for AggregatorConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            tools_timeout: DEFAULT_TOOLS_TIMEOUT,
        }
    }
}

/// Tools and open sessions for one request; dropping it closes the sessions
#[derive(Default)]
pub struct Aggregation {
    pub tools: ToolSet,
    pub connections: Vec<Arc<dyn ToolServerSession>>,
}

impl Aggregation {
    pub fn connection_names(&self) -> Vec<&str> {
        self.connections.iter().map(|c| c.name()).collect()
    }
}

/// Terminal state of one registry entry
enum EntryOutcome {
    Disabled,
    MissingUrl,
    ConnectFailed,
    ConnectTimedOut,
    Connected {
        session: Arc<dyn ToolServerSession>,
        tools: Vec<RemoteTool>,
    },
}

pub struct ToolServerAggregator {
    connector: Arc<dyn ToolServerConnector>,
    config: AggregatorConfig,
}

impl ToolServerAggregator {
    pub fn new(connector: Arc<dyn ToolServerConnector>, config: AggregatorConfig) -> Self {
        Self { connector, config }
    }

    pub fn config(&self) -> AggregatorConfig {
        self.config
    }

    /// Connect to every enabled server and merge the tools they advertise
    pub async fn aggregate(&self, registry: &Registry) -> Aggregation {
        let outcomes = join_all(registry.entries().iter().map(|entry| self.attempt(entry))).await;

        let mut aggregation = Aggregation::default();

        for (entry, outcome) in registry.entries().iter().zip(outcomes) {
            let EntryOutcome::Connected { session, tools } = outcome else {
                continue;
            };

            for tool in tools {
                let tool_name = tool.name.clone();
                let previous = aggregation.tools.insert(&entry.name, tool, session.clone());
                if let Some(previous) = previous {
                    tracing::debug!(
                        tool = %tool_name,
                        previous = %previous.server,
                        server = %entry.name,
                        "tool replaced by later registry entry"
                    );
                }
            }
            aggregation.connections.push(session);
        }

        tracing::info!(
            connections = aggregation.connections.len(),
            tools = aggregation.tools.len(),
            "MCP aggregation complete"
        );

        aggregation
    }

    async fn attempt(&self, entry: &RegistryEntry) -> EntryOutcome {
        let name = entry.name.as_str();

        if !entry.config.enabled {
            tracing::info!(server = %name, "MCP server disabled, skipping");
            return EntryOutcome::Disabled;
        }

        if entry.config.url.trim().is_empty() {
            tracing::warn!(server = %name, "MCP server has no URL configured, skipping");
            return EntryOutcome::MissingUrl;
        }

        let connect = self.connector.connect(entry.connection_config());
        let session = match tokio::time::timeout(self.config.connect_timeout, connect).await {
            Ok(Ok(session)) => session,
            Ok(Err(e)) => {
                tracing::error!(server = %name, error = %e, "failed to connect to MCP server");
                return EntryOutcome::ConnectFailed;
            }
            Err(_) => {
                tracing::error!(
                    server = %name,
                    timeout_ms = self.config.connect_timeout.as_millis() as u64,
                    "connection to MCP server timed out"
                );
                return EntryOutcome::ConnectTimedOut;
            }
        };

        let listing = tokio::time::timeout(self.config.tools_timeout, session.list_tools()).await;
        let tools = match listing {
            Ok(Ok(tools)) => {
                tracing::info!(server = %name, tools = tools.len(), "connected to MCP server");
                tools
            }
            Ok(Err(e)) => {
                tracing::error!(
                    server = %name,
                    error = %e,
                    "failed to retrieve tools from MCP server"
                );
                Vec::new()
            }
            Err(_) => {
                tracing::error!(
                    server = %name,
                    timeout_ms = self.config.tools_timeout.as_millis() as u64,
                    "tools retrieval from MCP server timed out"
                );
                Vec::new()
            }
        };

        EntryOutcome::Connected { session, tools }
    }
}

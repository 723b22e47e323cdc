//! MCP client for one tool server, built on the rmcp SDK

use async_trait::async_trait;
use rmcp::model::{ClientInfo, Implementation, ProtocolVersion};
use rmcp::service::RunningService;
use rmcp::transport::SseClientTransport;
use rmcp::{RoleClient, ServiceExt};
use serde_json::{json, Value};
use std::sync::Arc;

use super::aggregator::{ToolServerConnector, ToolServerSession};
use super::error::McpError;
use super::registry::ConnectionConfig;
use super::types::{coerce_arguments, CallToolResult, RemoteTool};

/// An initialized session with an MCP server; dropping it closes the session
pub struct McpClient {
    name: String,
    service: RunningService<RoleClient, ClientInfo>,
}

impl McpClient {
    /// Open the event stream and run the `initialize` handshake
    pub async fn connect(config: &ConnectionConfig) -> Result<Self, McpError> {
        let url = config.resolved_url();
        reqwest::Url::parse(&url)
            .map_err(|e| McpError::InvalidEndpoint(format!("{}: {}", url, e)))?;

        let transport = SseClientTransport::start(url.clone())
            .await
            .map_err(|e| McpError::Connect(e.to_string()))?;

        let service = client_info()
            .serve(transport)
            .await
            .map_err(|e| McpError::Initialize(e.to_string()))?;

        tracing::debug!(server = %config.name, url = %url, "tool server session initialized");

        Ok(Self {
            name: config.name.clone(),
            service,
        })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Every advertised tool, following pagination
    pub async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        let tools = self.service.list_all_tools().await?;
        Ok(tools.into_iter().map(RemoteTool::from).collect())
    }

    /// Invoke a tool; `isError` results are returned, not raised
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: Value,
    ) -> Result<CallToolResult, McpError> {
        let params = json!({
            "name": name,
            "arguments": coerce_arguments(arguments)?,
        });

        let result = self.service.call_tool(serde_json::from_value(params)?).await?;
        Ok(serde_json::from_value(serde_json::to_value(result)?)?)
    }
}

fn client_info() -> ClientInfo {
    ClientInfo {
        protocol_version: ProtocolVersion::V_2024_11_05,
        client_info: Implementation {
            name: env!("CARGO_PKG_NAME").to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            ..Default::default()
        },
        ..Default::default()
    }
}

#[async_trait]
impl ToolServerSession for McpClient {
    fn name(&self) -> &str {
        McpClient::name(self)
    }

    async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
        McpClient::list_tools(self).await
    }

    async fn call_tool(&self, name: &str, arguments: Value) -> Result<CallToolResult, McpError> {
        McpClient::call_tool(self, name, arguments).await
    }
}

/// Connects to servers over the HTTP+SSE transport
#[derive(Debug, Clone, Copy, Default)]
pub struct HttpSseConnector;

#[async_trait]
impl ToolServerConnector for HttpSseConnector {
    async fn connect(
        &self,
        config: ConnectionConfig,
    ) -> Result<Arc<dyn ToolServerSession>, McpError> {
        let client = McpClient::connect(&config).await?;
        Ok(Arc::new(client))
    }
}

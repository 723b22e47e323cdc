//! Merged tool set exposed to the generation loop

use async_trait::async_trait;
use serde_json::Value;
use std::collections::BTreeMap;
use std::sync::Arc;

use crate::llm::core::types::ToolDeclaration;
use crate::llm::tools::{ToolError, ToolExecutor};

use super::aggregator::ToolServerSession;
use super::types::RemoteTool;

/// A tool together with the session that serves it
#[derive(Clone)]
pub struct RegisteredTool {
    pub server: String,
    pub tool: RemoteTool,
    session: Arc<dyn ToolServerSession>,
}

impl std::fmt::Debug for RegisteredTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegisteredTool")
            .field("server", &self.server)
            .field("tool", &self.tool)
            .finish()
    }
}

/// Tools keyed by name; inserting an existing name replaces it
#[derive(Debug, Clone, Default)]
pub struct ToolSet {
    tools: BTreeMap<String, RegisteredTool>,
}

impl ToolSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a tool, returning the one it replaced
    pub fn insert(
        &mut self,
        server: impl Into<String>,
        tool: RemoteTool,
        session: Arc<dyn ToolServerSession>,
    ) -> Option<RegisteredTool> {
        self.tools.insert(
            tool.name.clone(),
            RegisteredTool {
                server: server.into(),
                tool,
                session,
            },
        )
    }

    pub fn get(&self, name: &str) -> Option<&RegisteredTool> {
        self.tools.get(name)
    }

    pub fn names(&self) -> Vec<&str> {
        self.tools.keys().map(String::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Declarations handed to the model
    pub fn declarations(&self) -> Vec<ToolDeclaration> {
        self.tools
            .values()
            .map(|registered| ToolDeclaration {
                name: registered.tool.name.clone(),
                description: registered.tool.description.clone().unwrap_or_default(),
                input_schema: registered.tool.input_schema.clone(),
            })
            .collect()
    }
}

#[async_trait]
impl ToolExecutor for ToolSet {
    async fn execute(
        &self,
        tool_use_id: String,
        name: String,
        arguments: Value,
    ) -> Result<String, ToolError> {
        let Some(registered) = self.tools.get(&name) else {
            return Err(ToolError::Failed {
                name,
                message: "unknown tool".to_string(),
            });
        };

        tracing::debug!(
            tool = %name,
            server = %registered.server,
            tool_use_id = %tool_use_id,
            "calling tool"
        );

        let result = registered
            .session
            .call_tool(&name, arguments)
            .await
            .map_err(|e| ToolError::Failed {
                name: name.clone(),
                message: e.to_string(),
            })?;

        if result.is_error {
            tracing::info!(tool = %name, server = %registered.server, "tool reported an error");
            return Err(ToolError::Reported(result.render()));
        }
        Ok(result.render())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::error::McpError;
    use crate::mcp::types::CallToolResult;
    use serde_json::json;

    struct StubSession {
        name: String,
        result: Result<CallToolResult, String>,
    }

    #[async_trait]
    impl ToolServerSession for StubSession {
        fn name(&self) -> &str {
            &self.name
        }

        async fn list_tools(&self) -> Result<Vec<RemoteTool>, McpError> {
            Ok(vec![])
        }

        async fn call_tool(
            &self,
            _name: &str,
            _arguments: Value,
        ) -> Result<CallToolResult, McpError> {
            self.result.clone().map_err(McpError::Service)
        }
    }

    fn session(name: &str, result: Result<CallToolResult, String>) -> Arc<dyn ToolServerSession> {
        Arc::new(StubSession {
            name: name.to_string(),
            result,
        })
    }

    fn tool(name: &str, description: &str) -> RemoteTool {
        RemoteTool {
            name: name.to_string(),
            description: Some(description.to_string()),
            input_schema: json!({"type": "object"}),
        }
    }

    fn text_result(text: &str, is_error: bool) -> CallToolResult {
        CallToolResult {
            content: vec![json!({"type": "text", "text": text})],
            structured_content: None,
            is_error,
        }
    }

    #[test]
    fn test_insert_overwrites_by_name() {
        let mut tools = ToolSet::new();
        assert!(tools
            .insert("a", tool("x", "from a"), session("a", Ok(CallToolResult::default())))
            .is_none());
        let replaced = tools.insert(
            "b",
            tool("x", "from b"),
            session("b", Ok(CallToolResult::default())),
        );

        assert_eq!(replaced.map(|r| r.server), Some("a".to_string()));
        assert_eq!(tools.len(), 1);
        assert_eq!(tools.get("x").unwrap().server, "b");
        assert_eq!(tools.declarations()[0].description, "from b");
    }

    #[tokio::test]
    async fn test_execute_success_and_reported_error() {
        let mut tools = ToolSet::new();
        tools.insert("a", tool("ok", ""), session("a", Ok(text_result("42", false))));
        tools.insert("a", tool("bad", ""), session("a", Ok(text_result("quota", true))));

        assert_eq!(
            tools.execute("c1".into(), "ok".into(), json!({})).await,
            Ok("42".to_string())
        );
        assert_eq!(
            tools.execute("c2".into(), "bad".into(), json!({})).await,
            Err(ToolError::Reported("quota".to_string()))
        );
    }

    #[tokio::test]
    async fn test_execute_unknown_or_broken_tool_fails() {
        let mut tools = ToolSet::new();
        tools.insert("a", tool("flaky", ""), session("a", Err("connection reset".to_string())));

        assert!(matches!(
            tools.execute("c1".into(), "missing".into(), json!({})).await,
            Err(ToolError::Failed { message, .. }) if message == "unknown tool"
        ));
        assert!(matches!(
            tools.execute("c2".into(), "flaky".into(), json!({})).await,
            Err(ToolError::Failed { message, .. }) if message.contains("connection reset")
        ));
    }
}

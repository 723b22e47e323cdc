//! Tool descriptors and call results as the relay sees them

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Map, Value};

use super::error::McpError;

/// A tool as advertised by `tools/list`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteTool {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "inputSchema", default = "empty_object_schema")]
    pub input_schema: Value,
}

fn empty_object_schema() -> Value {
    json!({"type": "object", "properties": {}})
}

impl From<rmcp::model::Tool> for RemoteTool {
    fn from(tool: rmcp::model::Tool) -> Self {
        Self {
            name: tool.name.to_string(),
            description: tool.description.map(|d| d.to_string()),
            input_schema: Value::Object((*tool.input_schema).clone()),
        }
    }
}

/// Result of `tools/call`
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<Value>,
    #[serde(rename = "structuredContent", default)]
    pub structured_content: Option<Value>,
    #[serde(rename = "isError", default, deserialize_with = "null_as_false")]
    pub is_error: bool,
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}

impl CallToolResult {
    /// Text shown to the model: text items joined by newline, else the structured
    /// content, else the raw content array
    pub fn render(&self) -> String {
        if let Some(text) = self.text_content() {
            return text;
        }
        if let Some(structured) = &self.structured_content {
            return structured.to_string();
        }
        Value::Array(self.content.clone()).to_string()
    }

    fn text_content(&self) -> Option<String> {
        let lines: Vec<&str> = self
            .content
            .iter()
            .filter_map(|item| match item.get("type").and_then(Value::as_str) {
                Some("text") => item.get("text").and_then(Value::as_str),
                Some("resource") => item
                    .get("resource")
                    .and_then(|r| r.get("text"))
                    .and_then(Value::as_str),
                _ => None,
            })
            .collect();

        if lines.is_empty() {
            None
        } else {
            Some(lines.join("\n"))
        }
    }
}

/// Normalize model-produced arguments into the `arguments` object of `tools/call`
pub fn coerce_arguments(value: Value) -> Result<Option<Map<String, Value>>, McpError> {
    match value {
        Value::Null => Ok(None),
        Value::Object(map) => Ok(Some(map)),
        Value::String(raw) => {
            let trimmed = raw.trim();
            if trimmed.is_empty() {
                return Ok(None);
            }
            let parsed: Value = serde_json::from_str(trimmed).map_err(|e| {
                McpError::InvalidArguments(format!("arguments must be valid JSON: {}", e))
            })?;
            coerce_arguments(parsed)
        }
        other => Err(McpError::InvalidArguments(format!(
            "arguments must be a JSON object; got {}",
            other
        ))),
    }
}

use rmcp::service::ServiceError;
use thiserror::Error;

/// Errors raised while talking to an MCP tool server
#[derive(Debug, Error)]
pub enum McpError {
    /// The configured server URL cannot be parsed
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The event stream could not be opened or never announced its message endpoint
    #[error("Connection failed: {0}")]
    Connect(String),

    /// The `initialize` handshake failed
    #[error("Initialization failed: {0}")]
    Initialize(String),

    /// A request on an established session failed
    #[error("Service error: {0}")]
    Service(String),

    /// Tool arguments were not a JSON object
    #[error("Invalid tool arguments: {0}")]
    InvalidArguments(String),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<ServiceError> for McpError {
    fn from(err: ServiceError) -> Self {
        McpError::Service(err.to_string())
    }
}

//! Model Context Protocol tool servers
//!
//! - `registry`: which servers exist, loaded once at startup
//! - `client`: sessions over the HTTP+SSE transport via rmcp
//! - `aggregator`: per-request fan-out and merge into a [`ToolSet`]

pub mod aggregator;
pub mod client;
pub mod error;
pub mod registry;
pub mod toolset;
pub mod types;

pub use aggregator::{
    Aggregation, AggregatorConfig, ToolServerAggregator, ToolServerConnector, ToolServerSession,
};
pub use client::{HttpSseConnector, McpClient};
pub use error::McpError;
pub use registry::{ConnectionConfig, Registry, RegistryEntry, RegistryError, ServerConfig};
pub use toolset::ToolSet;
pub use types::{CallToolResult, RemoteTool};

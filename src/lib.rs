// HTTP server modules
pub mod handlers;
pub mod models;
pub mod routes;
pub mod sse;
pub mod state;

pub mod config;
pub mod conversation;
pub mod event_stream;

// Tool-server registry, MCP client and aggregation
pub mod mcp;

// LLM abstraction layer
pub mod llm;

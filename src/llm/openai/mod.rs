//! OpenAI provider implementation
//!
//! This module provides a streaming client for the OpenAI Chat Completions API.
//! Any endpoint speaking the same protocol works through `OPENAI_BASE_URL`.

pub mod client;
pub mod mapper;
pub mod sse;
pub mod types;

// Re-export commonly used types
pub use client::OpenAiClient;

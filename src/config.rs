// Service Configuration
//
// Loaded from environment variables (optionally seeded from a `.env` file in main).

use std::net::SocketAddr;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

use crate::llm::agent::DEFAULT_MAX_STEPS;
use crate::llm::core::config::{GenerationConfig, DEFAULT_MAX_TOKENS};
use crate::mcp::aggregator::{AggregatorConfig, DEFAULT_CONNECT_TIMEOUT, DEFAULT_TOOLS_TIMEOUT};
use crate::mcp::registry::DEFAULT_REGISTRY_PATH;

pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:3030";
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_OPENAI_MODEL: &str = "gpt-4o";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("missing required environment variable {0}")]
    Missing(&'static str),

    #[error("invalid value for {key}: {value:?} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}

/// Model provider settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OpenAiConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
}

/// Configuration for the whole service
#[derive(Debug, Clone, PartialEq)]
pub struct AppConfig {
    pub bind_addr: SocketAddr,
    pub registry_path: PathBuf,
    pub openai: OpenAiConfig,
    /// Model calls allowed per request
    pub max_steps: usize,
    /// Sampling parameters sent with every model call
    pub generation: GenerationConfig,
    pub aggregator: AggregatorConfig,
}

impl AppConfig {
    /// Create configuration from environment variables
    ///
    /// Environment variables:
    /// - `RELAY_BIND_ADDR`: listen address (default: 127.0.0.1:3030)
    /// - `MCP_REGISTRY_PATH`: tool server registry (default: config/mcp-registry.json)
    /// - `OPENAI_API_KEY`: required
    /// - `OPENAI_BASE_URL`: API root (default: https://api.openai.com/v1)
    /// - `OPENAI_MODEL`: model id (default: gpt-4o)
    /// - `RELAY_MAX_STEPS`: model calls per request (default: 20)
    /// - `RELAY_MAX_TOKENS`: tokens per model call (default: 4096)
    /// - `OPENAI_TEMPERATURE`, `OPENAI_TOP_P`: sampling (default: provider's own)
    /// - `OPENAI_STOP`: comma-separated stop sequences (default: none)
    /// - `MCP_CONNECT_TIMEOUT_MS`: per-server connect ceiling (default: 5000)
    /// - `MCP_TOOLS_TIMEOUT_MS`: per-server tool listing ceiling (default: 3000)
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an explicit variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        // Blank values count as unset
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_key = get("OPENAI_API_KEY").ok_or(ConfigError::Missing("OPENAI_API_KEY"))?;

        let bind_addr: SocketAddr = parse_or("RELAY_BIND_ADDR", get("RELAY_BIND_ADDR"), || {
            DEFAULT_BIND_ADDR.parse()
        })?;

        let registry_path = get("MCP_REGISTRY_PATH")
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_REGISTRY_PATH));

        let max_steps: usize = parse_or("RELAY_MAX_STEPS", get("RELAY_MAX_STEPS"), || {
            Ok::<_, std::num::ParseIntError>(DEFAULT_MAX_STEPS)
        })?;
        if max_steps == 0 {
            return Err(ConfigError::Invalid {
                key: "RELAY_MAX_STEPS",
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        let max_tokens: u32 = parse_or("RELAY_MAX_TOKENS", get("RELAY_MAX_TOKENS"), || {
            Ok::<_, std::num::ParseIntError>(DEFAULT_MAX_TOKENS)
        })?;

        let mut generation = GenerationConfig::new(max_tokens);
        if let Some(temperature) = parse_opt("OPENAI_TEMPERATURE", get("OPENAI_TEMPERATURE"))? {
            generation = generation.with_temperature(temperature);
        }
        if let Some(top_p) = parse_opt("OPENAI_TOP_P", get("OPENAI_TOP_P"))? {
            generation = generation.with_top_p(top_p);
        }
        if let Some(stop) = get("OPENAI_STOP") {
            let sequences: Vec<String> = stop
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(String::from)
                .collect();
            if !sequences.is_empty() {
                generation = generation.with_stop_sequences(sequences);
            }
        }

        let connect_ms: u64 =
            parse_or("MCP_CONNECT_TIMEOUT_MS", get("MCP_CONNECT_TIMEOUT_MS"), || {
                Ok::<_, std::num::ParseIntError>(DEFAULT_CONNECT_TIMEOUT.as_millis() as u64)
            })?;

        let tools_ms: u64 = parse_or("MCP_TOOLS_TIMEOUT_MS", get("MCP_TOOLS_TIMEOUT_MS"), || {
            Ok::<_, std::num::ParseIntError>(DEFAULT_TOOLS_TIMEOUT.as_millis() as u64)
        })?;

        Ok(Self {
            bind_addr,
            registry_path,
            openai: OpenAiConfig {
                api_key,
                base_url: get("OPENAI_BASE_URL")
                    .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
                model: get("OPENAI_MODEL").unwrap_or_else(|| DEFAULT_OPENAI_MODEL.to_string()),
            },
            max_steps,
            generation,
            aggregator: AggregatorConfig {
                connect_timeout: Duration::from_millis(connect_ms),
                tools_timeout: Duration::from_millis(tools_ms),
            },
        })
    }
}

fn parse_or<T, E>(
    key: &'static str,
    raw: Option<String>,
    default: impl FnOnce() -> Result<T, E>,
) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    E: std::fmt::Display,
{
    match raw {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        }),
        None => default().map_err(|e| ConfigError::Invalid {
            key,
            value: String::new(),
            reason: e.to_string(),
        }),
    }
}

fn parse_opt<T>(key: &'static str, raw: Option<String>) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    raw.map(|value| {
        value.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            reason: e.to_string(),
            value,
        })
    })
    .transpose()
}

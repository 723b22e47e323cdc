//! Static registry of MCP tool servers
//!
//! The registry is a JSON object keyed by server name:
//!
//! ```json
//! {
//!   "search": { "url": "http://localhost:8931/sse", "enabled": true,
//!               "env": { "SEARCH_TOKEN": "abc" } }
//! }
//! ```
//!
//! It is read once at startup. A missing or malformed file yields an empty registry;
//! malformed entries are skipped individually. Entry order is the file's key order.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::LazyLock;
use thiserror::Error;

/// Location of the registry relative to the working directory
pub const DEFAULT_REGISTRY_PATH: &str = "config/mcp-registry.json";

static PLACEHOLDER_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)\}").expect("placeholder regex must compile")
});

#[derive(Debug, Error)]
pub enum RegistryError {
    #[error("failed to read registry: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to parse registry: {0}")]
    Json(#[from] serde_json::Error),

    #[error("registry must be a JSON object keyed by server name")]
    NotAnObject,
}

/// One server's settings as written in the registry file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub enabled: bool,
    /// Values for `${NAME}` placeholders in `url`
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RegistryEntry {
    pub name: String,
    pub config: ServerConfig,
}

impl RegistryEntry {
    pub fn new(name: impl Into<String>, config: ServerConfig) -> Self {
        Self {
            name: name.into(),
            config,
        }
    }

    /// Connection settings handed to a connector
    pub fn connection_config(&self) -> ConnectionConfig {
        ConnectionConfig {
            name: self.name.clone(),
            url: self.config.url.clone(),
            env: self.config.env.clone(),
        }
    }
}

/// Ordered, immutable set of registry entries
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Registry {
    entries: Vec<RegistryEntry>,
}

impl Registry {
    pub fn new(entries: Vec<RegistryEntry>) -> Self {
        Self { entries }
    }

    pub fn empty() -> Self {
        Self::default()
    }

    /// Parse registry JSON; invalid entries are skipped with a warning
    pub fn parse(json: &str) -> Result<Self, RegistryError> {
        let value: serde_json::Value = serde_json::from_str(json)?;
        let serde_json::Value::Object(map) = value else {
            return Err(RegistryError::NotAnObject);
        };

        let mut entries = Vec::with_capacity(map.len());
        for (name, raw) in map {
            match serde_json::from_value::<ServerConfig>(raw) {
                Ok(config) => entries.push(RegistryEntry { name, config }),
                Err(e) => {
                    tracing::warn!(server = %name, error = %e, "skipping malformed registry entry")
                }
            }
        }

        Ok(Self { entries })
    }

    /// Read the registry file, degrading to an empty registry on any failure
    pub fn load(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();

        if !path.exists() {
            tracing::warn!(
                path = %path.display(),
                "MCP registry file not found, using empty registry"
            );
            return Self::empty();
        }

        let result = std::fs::read_to_string(path)
            .map_err(RegistryError::from)
            .and_then(|contents| Self::parse(&contents));

        match result {
            Ok(registry) => {
                tracing::info!(
                    path = %path.display(),
                    servers = registry.len(),
                    "loaded MCP registry"
                );
                registry
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "failed to load MCP registry, using empty registry"
                );
                Self::empty()
            }
        }
    }

    pub fn entries(&self) -> &[RegistryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Everything a connector needs for one server
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConnectionConfig {
    pub name: String,
    pub url: String,
    pub env: BTreeMap<String, String>,
}

impl ConnectionConfig {
    /// Expand `${NAME}` placeholders from the entry env, then the process environment
    pub fn resolved_url(&self) -> String {
        self.resolved_url_with(|key| std::env::var(key).ok())
    }

    /// As [`resolved_url`](Self::resolved_url) with an explicit fallback lookup
    pub fn resolved_url_with(&self, fallback: impl Fn(&str) -> Option<String>) -> String {
        PLACEHOLDER_RE
            .replace_all(&self.url, |caps: &regex::Captures<'_>| {
                let key = &caps[1];
                match self.env.get(key).cloned().or_else(|| fallback(key)) {
                    Some(value) => value,
                    None => {
                        tracing::warn!(
                            server = %self.name,
                            placeholder = %key,
                            "unresolved URL placeholder"
                        );
                        caps[0].to_string()
                    }
                }
            })
            .into_owned()
    }
}

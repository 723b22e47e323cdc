//! Normalization of loosely-typed client conversations
//!
//! Clients send `{messages, message}` where neither half is trusted. The result is
//! always a non-empty list of `user`/`assistant`/`system` messages with string content.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::llm::core::types::Message;

/// Substituted when nothing usable was sent
pub const DEFAULT_GREETING: &str = "Hello";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    User,
    Assistant,
    System,
}

impl ChatRole {
    fn parse(role: &str) -> Option<Self> {
        match role {
            "user" => Some(ChatRole::User),
            "assistant" => Some(ChatRole::Assistant),
            "system" => Some(ChatRole::System),
            _ => None,
        }
    }
}

/// A normalized conversation message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn new(role: ChatRole, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::new(ChatRole::User, content)
    }
}

impl From<&ChatMessage> for Message {
    fn from(message: &ChatMessage) -> Self {
        match message.role {
            ChatRole::User => Message::user(message.content.clone()),
            ChatRole::Assistant => Message::assistant(message.content.clone()),
            ChatRole::System => Message::system(message.content.clone()),
        }
    }
}

/// Append the new client message to the prior conversation
///
/// A non-array `prior` counts as empty. A `null` message appends nothing. When the
/// new message carries the same non-null `id` as the last prior message it replaces
/// that message instead.
pub fn append_client_message(prior: Value, message: Value) -> Vec<Value> {
    let mut conversation = match prior {
        Value::Array(items) => items,
        _ => Vec::new(),
    };

    if message.is_null() {
        return conversation;
    }

    let same_id = match (conversation.last().and_then(message_id), message_id(&message)) {
        (Some(last), Some(new)) => last == new,
        _ => false,
    };
    if same_id {
        conversation.pop();
    }

    conversation.push(message);
    conversation
}

fn message_id(value: &Value) -> Option<&Value> {
    value.get("id").filter(|id| !id.is_null())
}

/// Coerce raw conversation entries into accepted messages
///
/// Objects need both `role` and `content`; unknown roles are dropped. Bare strings
/// become user messages. Everything else is dropped.
pub fn normalize_messages(conversation: &[Value]) -> Vec<ChatMessage> {
    let mut normalized: Vec<ChatMessage> = conversation
        .iter()
        .filter_map(|entry| match entry {
            Value::String(text) => Some(ChatMessage::user(text.clone())),
            Value::Object(fields) => {
                let role = fields.get("role")?.as_str().and_then(ChatRole::parse)?;
                let content = fields.get("content")?;
                Some(ChatMessage::new(role, js_string(content)))
            }
            _ => None,
        })
        .collect();

    if normalized.is_empty() {
        normalized.push(ChatMessage::user(DEFAULT_GREETING));
    }
    normalized
}

/// Append then normalize
pub fn normalize(prior: Value, message: Value) -> Vec<ChatMessage> {
    normalize_messages(&append_client_message(prior, message))
}

/// String conversion with the semantics web clients expect (`String(value)`)
fn js_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => "null".to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Number(n) => js_number(n),
        Value::Array(items) => items
            .iter()
            .map(|item| match item {
                Value::Null => String::new(),
                other => js_string(other),
            })
            .collect::<Vec<_>>()
            .join(","),
        Value::Object(_) => "[object Object]".to_string(),
    }
}

fn js_number(n: &serde_json::Number) -> String {
    if let Some(i) = n.as_i64() {
        return i.to_string();
    }
    if let Some(u) = n.as_u64() {
        return u.to_string();
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f.abs() < 1e21 => format!("{:.0}", f),
        Some(f) => f.to_string(),
        None => n.to_string(),
    }
}

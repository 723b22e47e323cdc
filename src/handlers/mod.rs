// Handlers module

pub mod chat;
pub mod completions;

pub use chat::chat_handler;
pub use completions::completions_handler;

use std::sync::Arc;
use thiserror::Error;
use warp::http::StatusCode;
use warp::Reply;

use crate::conversation::ChatMessage;
use crate::llm::agent::AgentError;
use crate::llm::core::types::{Message, ToolDeclaration};
use crate::mcp::{Aggregation, ToolServerSession, ToolSet};

/// Failures that end a request with a plain-text 500
#[derive(Debug, Error)]
pub enum HandlerError {
    #[error("{0}")]
    InvalidBody(#[from] serde_json::Error),

    #[error("Error: {0}")]
    Generation(#[from] AgentError),
}

impl HandlerError {
    pub fn status(&self) -> StatusCode {
        StatusCode::INTERNAL_SERVER_ERROR
    }

    pub fn into_response(self) -> warp::reply::Response {
        let status = self.status();
        warp::reply::with_status(self.to_string(), status).into_response()
    }
}

/// Tools for one request, split into what the generator needs and the open sessions
pub(crate) struct RequestTools {
    pub tools: Arc<ToolSet>,
    pub declarations: Vec<ToolDeclaration>,
    /// Held until generation ends; dropping closes the sessions
    pub connections: Vec<Arc<dyn ToolServerSession>>,
}

impl From<Aggregation> for RequestTools {
    fn from(aggregation: Aggregation) -> Self {
        let declarations = aggregation.tools.declarations();
        Self {
            tools: Arc::new(aggregation.tools),
            declarations,
            connections: aggregation.connections,
        }
    }
}

pub(crate) fn to_llm_messages(messages: &[ChatMessage]) -> Vec<Message> {
    messages.iter().map(Message::from).collect()
}

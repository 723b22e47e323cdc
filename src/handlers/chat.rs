// POST /api/chat handler

use bytes::Bytes;
use futures_util::stream::StreamExt;
use serde_json::Value;
use std::convert::Infallible;
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use uuid::Uuid;
use warp::sse::Event;
use warp::Reply;

use super::{to_llm_messages, HandlerError, RequestTools};
use crate::conversation::{normalize, ChatMessage};
use crate::llm::agent::AgentEvent;
use crate::llm::core::types::{ContentBlockStart, ContentDelta, StreamEvent};
use crate::llm::generation::Generator;
use crate::models::ChatRequest;
use crate::sse::{
    create_agent_text_event, create_done_event, create_tool_call_event, create_tool_error_event,
    create_tool_response_event,
};
use crate::state::AppState;

const EVENT_BUFFER: usize = 100;

pub async fn chat_handler(
    body: Bytes,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    let request = match ChatRequest::from_slice(&body) {
        Ok(request) => request,
        Err(e) => {
            tracing::error!(error = %e, "invalid chat request body");
            return Ok(HandlerError::from(e).into_response());
        }
    };

    let messages = normalize(request.messages, request.message);
    tracing::info!(messages = messages.len(), "POST /api/chat");

    let request_tools = RequestTools::from(state.aggregator.aggregate(&state.registry).await);

    let event_stream = chat_event_stream(state.generator.clone(), messages, request_tools);

    Ok(warp::sse::reply(warp::sse::keep_alive().stream(event_stream)).into_response())
}

/// Translate the generation into SSE events
///
/// The generation runs on its own task and feeds the returned stream. It ends with
/// `done` on success; on failure the stream just ends. Once the receiving side is
/// dropped the task stops, which cancels the model call and closes the sessions.
pub(crate) fn chat_event_stream(
    generator: Generator,
    messages: Vec<ChatMessage>,
    request_tools: RequestTools,
) -> ReceiverStream<Result<Event, Infallible>> {
    let (tx, rx) = mpsc::channel(EVENT_BUFFER);

    tokio::spawn(async move {
        let RequestTools { tools, declarations, connections } = request_tools;
        let mut agent_stream = generator.stream(to_llm_messages(&messages), tools, declarations);

        // Text deltas of one step share the step's message id
        let mut message_id = Uuid::new_v4().to_string();

        while let Some(event) = agent_stream.next().await {
            let frame = match event {
                Ok(AgentEvent::StepStarted { .. }) => {
                    message_id = Uuid::new_v4().to_string();
                    None
                }
                Ok(AgentEvent::LlmEvent(StreamEvent::ContentBlockStart {
                    block: ContentBlockStart::Text { text },
                    ..
                }))
                | Ok(AgentEvent::LlmEvent(StreamEvent::ContentDelta {
                    delta: ContentDelta::TextDelta { text },
                    ..
                })) => {
                    if text.is_empty() {
                        None
                    } else {
                        Some(create_agent_text_event(message_id.clone(), text))
                    }
                }
                Ok(AgentEvent::ToolExecutionStarted { tool_use_id, name, input }) => {
                    Some(create_tool_call_event(tool_use_id, name, input))
                }
                Ok(AgentEvent::ToolExecutionCompleted { tool_use_id, result, .. }) => {
                    Some(create_tool_response_event(
                        Uuid::new_v4().to_string(),
                        tool_use_id,
                        Value::String(result),
                    ))
                }
                Ok(AgentEvent::ToolExecutionFailed { tool_use_id, error, .. }) => Some(
                    create_tool_error_event(Uuid::new_v4().to_string(), tool_use_id, error),
                ),
                Ok(AgentEvent::Completed { finish_reason, steps }) => {
                    tracing::info!(steps, finish_reason = ?finish_reason, "chat stream complete");
                    Some(create_done_event(finish_reason, steps))
                }
                Ok(_) => None,
                Err(e) => {
                    tracing::error!(error = %e, "generation failed mid-stream");
                    break;
                }
            };

            if let Some(frame) = frame {
                if tx.send(frame).await.is_err() {
                    tracing::info!("client disconnected, cancelling generation");
                    break;
                }
            }
        }

        drop(agent_stream);
        drop(connections);
    });

    ReceiverStream::new(rx)
}

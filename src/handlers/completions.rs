// POST /api/completions handler

use bytes::Bytes;
use warp::Reply;

use super::{to_llm_messages, HandlerError, RequestTools};
use crate::conversation::normalize;
use crate::models::{ChatRequest, CompletionResponse};
use crate::state::AppState;

pub async fn completions_handler(
    body: Bytes,
    state: AppState,
) -> Result<warp::reply::Response, warp::Rejection> {
    match complete(&state, &body).await {
        Ok(response) => Ok(warp::reply::json(&response).into_response()),
        Err(e) => {
            tracing::error!(error = %e, "completion failed");
            Ok(e.into_response())
        }
    }
}

/// Normalize, aggregate tools, generate to completion
pub async fn complete(state: &AppState, body: &[u8]) -> Result<CompletionResponse, HandlerError> {
    let request = ChatRequest::from_slice(body)?;
    let messages = normalize(request.messages, request.message);
    tracing::info!(messages = messages.len(), "POST /api/completions");

    let request_tools = RequestTools::from(state.aggregator.aggregate(&state.registry).await);

    let generation = state
        .generator
        .generate(
            to_llm_messages(&messages),
            request_tools.tools.clone(),
            request_tools.declarations.clone(),
        )
        .await?;

    tracing::info!(
        steps = generation.steps,
        tool_calls = generation.tool_calls.len(),
        input_tokens = generation.usage.input_tokens,
        output_tokens = generation.usage.output_tokens,
        "completion generated"
    );

    Ok(CompletionResponse {
        content: generation.text,
        markdown: true,
        tool_calls: generation.tool_calls,
        messages,
    })
}

//! OpenAI client against a mock Chat Completions endpoint

use async_trait::async_trait;
use futures::StreamExt;
use serde_json::{json, Value};
use std::sync::Arc;
use wiremock::matchers::{body_partial_json, body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use toolrelay::config::OpenAiConfig;
use toolrelay::llm::core::config::GenerationConfig;
use toolrelay::llm::core::error::LlmError;
use toolrelay::llm::core::provider::LlmProvider;
use toolrelay::llm::core::types::{
    ContentBlockStart, ContentDelta, FinishReason, GenerateRequest, Message, StreamEvent,
    ToolDeclaration, UsageMetadata,
};
use toolrelay::llm::generation::Generator;
use toolrelay::llm::openai::OpenAiClient;
use toolrelay::llm::tools::{ToolError, ToolExecutor};

fn client(server: &MockServer) -> OpenAiClient {
    OpenAiClient::new(&OpenAiConfig {
        api_key: "sk-test".to_string(),
        base_url: format!("{}/v1", server.uri()),
        model: "gpt-4o-mini".to_string(),
    })
    .unwrap()
}

fn request(text: &str) -> GenerateRequest {
    GenerateRequest {
        messages: vec![Message::user(text)],
        tools: None,
        config: GenerationConfig::default(),
    }
}

fn sse_body(chunks: &[Value]) -> String {
    let mut body = String::new();
    for chunk in chunks {
        body.push_str(&format!("data: {}\n\n", chunk));
    }
    body.push_str("data: [DONE]\n\n");
    body
}

fn chunk(delta: Value, finish_reason: Option<&str>) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "model": "gpt-4o-mini",
        "choices": [{"index": 0, "delta": delta, "finish_reason": finish_reason}]
    })
}

fn usage_chunk(prompt: u32, completion: u32) -> Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion.chunk",
        "choices": [],
        "usage": {"prompt_tokens": prompt, "completion_tokens": completion, "total_tokens": prompt + completion}
    })
}

fn text_response(parts: &[&str]) -> ResponseTemplate {
    let mut chunks = vec![chunk(json!({"role": "assistant", "content": ""}), None)];
    chunks.extend(parts.iter().map(|p| chunk(json!({"content": p}), None)));
    chunks.push(chunk(json!({}), Some("stop")));
    chunks.push(usage_chunk(11, 3));
    ResponseTemplate::new(200).set_body_raw(sse_body(&chunks), "text/event-stream")
}

fn tool_call_response(id: &str, name: &str, argument_parts: &[&str]) -> ResponseTemplate {
    let mut chunks = vec![chunk(
        json!({
            "role": "assistant",
            "tool_calls": [{"index": 0, "id": id, "type": "function", "function": {"name": name, "arguments": ""}}]
        }),
        None,
    )];
    chunks.extend(argument_parts.iter().map(|p| {
        chunk(
            json!({"tool_calls": [{"index": 0, "function": {"arguments": p}}]}),
            None,
        )
    }));
    chunks.push(chunk(json!({}), Some("tool_calls")));
    ResponseTemplate::new(200).set_body_raw(sse_body(&chunks), "text/event-stream")
}

async fn collect(
    client: &OpenAiClient,
    request: GenerateRequest,
) -> Vec<Result<StreamEvent, LlmError>> {
    client.stream_generate(request).await.unwrap().collect().await
}

#[tokio::test]
async fn test_streams_text_and_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-mini",
            "stream": true,
            "stream_options": {"include_usage": true}
        })))
        .respond_with(text_response(&["Hel", "lo!"]))
        .expect(1)
        .mount(&server)
        .await;

    let events = collect(&client(&server), request("hi")).await;

    let text: String = events
        .iter()
        .filter_map(|e| match e {
            Ok(StreamEvent::ContentDelta {
                delta: ContentDelta::TextDelta { text },
                ..
            }) => Some(text.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(text, "Hello!");

    match events.last() {
        Some(Ok(StreamEvent::MessageEnd {
            finish_reason,
            usage,
        })) => {
            assert_eq!(*finish_reason, FinishReason::Stop);
            assert_eq!(*usage, UsageMetadata::new(11, 3));
        }
        other => panic!("Expected MessageEnd, got {:?}", other),
    }
}

#[tokio::test]
async fn test_streams_tool_call_arguments() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(tool_call_response("call_abc", "search", &["{\"query\":", "\"rust\"}"]))
        .mount(&server)
        .await;

    let events = collect(&client(&server), request("find rust")).await;

    let started = events.iter().find_map(|e| match e {
        Ok(StreamEvent::ContentBlockStart {
            block: ContentBlockStart::ToolUse { id, name },
            ..
        }) => Some((id.clone(), name.clone())),
        _ => None,
    });
    assert_eq!(started, Some(("call_abc".to_string(), "search".to_string())));

    let arguments: String = events
        .iter()
        .filter_map(|e| match e {
            Ok(StreamEvent::ContentDelta {
                delta: ContentDelta::ToolUseDelta { partial },
                ..
            }) => Some(partial.partial_json.as_str()),
            _ => None,
        })
        .collect();
    assert_eq!(arguments, r#"{"query":"rust"}"#);

    assert!(matches!(
        events.last(),
        Some(Ok(StreamEvent::MessageEnd {
            finish_reason: FinishReason::ToolUse,
            ..
        }))
    ));
}

#[tokio::test]
async fn test_error_frame_surfaces_as_provider_error() {
    let server = MockServer::start().await;
    let body = format!(
        "data: {}\n\ndata: {}\n\n",
        chunk(json!({"role": "assistant", "content": "Par"}), None),
        json!({
            "error": {"message": "The server had an error", "type": "server_error", "code": null}
        })
    );
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let events = collect(&client(&server), request("hi")).await;

    let error = events.into_iter().find_map(Result::err);
    match error {
        Some(LlmError::ProviderError { code, message }) => {
            assert_eq!(code, "server_error");
            assert_eq!(message, "The server had an error");
        }
        other => panic!("Expected ProviderError, got {:?}", other),
    }
}

#[tokio::test]
async fn test_unauthorized_maps_to_authentication_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": {"message": "Incorrect API key provided", "type": "invalid_request_error", "code": "invalid_api_key"}
        })))
        .mount(&server)
        .await;

    let result = client(&server).stream_generate(request("hi")).await;

    match result {
        Err(LlmError::AuthenticationError(message)) => {
            assert_eq!(message, "Incorrect API key provided")
        }
        Err(other) => panic!("Expected AuthenticationError, got {:?}", other),
        Ok(_) => panic!("Expected an error"),
    }
}

#[tokio::test]
async fn test_server_error_keeps_status_and_body() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
        .mount(&server)
        .await;

    let result = client(&server).stream_generate(request("hi")).await;

    match result {
        Err(LlmError::HttpError { status, body }) => {
            assert_eq!(status, 503);
            assert_eq!(body, "overloaded");
        }
        Err(other) => panic!("Expected HttpError, got {:?}", other),
        Ok(_) => panic!("Expected an error"),
    }
}

struct WeatherExecutor;

#[async_trait]
impl ToolExecutor for WeatherExecutor {
    async fn execute(
        &self,
        _tool_use_id: String,
        name: String,
        arguments: Value,
    ) -> Result<String, ToolError> {
        assert_eq!(name, "weather");
        Ok(format!("72F and sunny in {}", arguments["city"].as_str().unwrap_or("?")))
    }
}

#[tokio::test]
async fn test_generation_loop_over_http() {
    let server = MockServer::start().await;

    // The follow-up request carries the tool result back to the model
    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_string_contains(r#""tool_call_id":"call_w""#))
        .and(body_string_contains("72F and sunny in NYC"))
        .respond_with(text_response(&["It is 72F and sunny."]))
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/v1/chat/completions"))
        .and(body_partial_json(json!({"tool_choice": "auto"})))
        .respond_with(tool_call_response("call_w", "weather", &["{\"city\":\"NYC\"}"]))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    let generator = Generator::new(Arc::new(client(&server)), GenerationConfig::default());
    let declarations = vec![ToolDeclaration {
        name: "weather".to_string(),
        description: "Current weather".to_string(),
        input_schema: json!({"type": "object", "properties": {"city": {"type": "string"}}}),
    }];

    let generation = generator
        .generate(
            vec![Message::user("Weather in NYC?")],
            Arc::new(WeatherExecutor),
            declarations,
        )
        .await
        .unwrap();

    assert_eq!(generation.text, "It is 72F and sunny.");
    assert_eq!(generation.steps, 2);
    assert_eq!(generation.tool_calls.len(), 1);
    assert_eq!(generation.tool_calls[0].args, json!({"city": "NYC"}));
}

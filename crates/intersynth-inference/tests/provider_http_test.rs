//! HTTP-level tests for the provider backends.
//!
//! Each test stands up a wiremock server in place of the provider and checks
//! the request shape that reaches it and the classification of what comes
//! back.

use intersynth_core::{FailureClass, GenerationBackend, Provider};
use intersynth_inference::{build_backend, AdapterConfig, ModelRegistry};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

fn backend_for(
    server: &MockServer,
    provider: Provider,
    model: &str,
) -> std::sync::Arc<dyn GenerationBackend> {
    let profile = ModelRegistry::new().resolve(provider, model);
    let config = AdapterConfig::new(provider)
        .with_api_key("test-key")
        .with_base_url(server.uri())
        .with_timeout_secs(5);
    build_backend(profile, config).expect("Failed to create backend")
}

fn chat_response(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-123",
        "choices": [{
            "index": 0,
            "message": { "role": "assistant", "content": content },
            "finish_reason": "stop"
        }]
    })
}

// =============================================================================
// OpenAI
// =============================================================================

#[tokio::test]
async fn test_openai_chat_model_sends_max_tokens_and_temperature() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("Authorization", "Bearer test-key"))
        .and(body_partial_json(json!({
            "model": "gpt-4o-2024-08-06",
            "max_tokens": 3000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("Transcript")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-4o-2024-08-06");
    let text = backend.generate("prompt", 3000).await.unwrap();
    assert_eq!(text, "Transcript");

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("temperature").is_some());
    assert!(body.get("max_completion_tokens").is_none());
}

#[tokio::test]
async fn test_openai_reasoning_model_omits_temperature() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "o1-2024-12-17",
            "max_completion_tokens": 5000,
            "reasoning_effort": "medium"
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "o1-2024-12-17");
    backend.generate("prompt", 5000).await.unwrap();

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("temperature").is_none());
    assert!(body.get("max_tokens").is_none());
}

#[tokio::test]
async fn test_openai_unknown_model_uses_completion_tokens() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(body_partial_json(json!({
            "model": "gpt-5-experimental",
            "max_completion_tokens": 3000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("ok")))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-5-experimental");
    backend.generate("prompt", 3000).await.unwrap();

    let requests: Vec<Request> = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert!(body.get("temperature").is_none());
    assert!(body.get("max_tokens").is_none());
    assert!(body.get("reasoning_effort").is_none());
}

#[tokio::test]
async fn test_openai_429_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "message": "Rate limit reached for requests",
                "type": "requests",
                "code": "rate_limit_exceeded"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-4o-mini-2024-07-18");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::RateLimited);
    assert!(err.is_retryable());
}

#[tokio::test]
async fn test_openai_unsupported_parameter_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "message": "Unsupported parameter: 'max_tokens' is not supported with this model.",
                "type": "invalid_request_error",
                "code": "unsupported_parameter"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-4o-2024-08-06");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Invalid);
    assert!(!err.is_retryable());
    assert!(err.message.contains("Unsupported parameter"));
}

#[tokio::test]
async fn test_openai_empty_content_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(chat_response("   ")))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-4o-2024-08-06");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Invalid);
}

#[tokio::test]
async fn test_openai_malformed_success_body_is_invalid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::OpenAi, "gpt-4o-2024-08-06");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Invalid);
}

// =============================================================================
// Anthropic
// =============================================================================

#[tokio::test]
async fn test_anthropic_success_and_headers() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-haiku-20240307",
            "max_tokens": 4096
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "content": [{ "type": "text", "text": "Interviewer: Hello" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    // 8000 requested, clamped to the Haiku 3 ceiling.
    let backend = backend_for(&server, Provider::Anthropic, "claude-3-haiku-20240307");
    let text = backend.generate("prompt", 8000).await.unwrap();
    assert_eq!(text, "Interviewer: Hello");
}

#[tokio::test]
async fn test_anthropic_401_is_unauthorized() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "type": "error",
            "error": { "type": "authentication_error", "message": "invalid x-api-key" }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::Anthropic, "claude-3-5-haiku-20241022");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Unauthorized);
}

#[tokio::test]
async fn test_anthropic_overloaded_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(529).set_body_json(json!({
            "type": "error",
            "error": { "type": "overloaded_error", "message": "Overloaded" }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::Anthropic, "claude-3-7-sonnet-20250219");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Transient);
}

// =============================================================================
// Gemini
// =============================================================================

#[tokio::test]
async fn test_gemini_success() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash-lite:generateContent"))
        .and(header("x-goog-api-key", "test-key"))
        .and(body_partial_json(json!({
            "generationConfig": { "maxOutputTokens": 2000 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [{ "text": "Analysis" }] },
                "finishReason": "STOP"
            }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::Google, "gemini-2-0-flash-lite");
    let text = backend.generate("prompt", 2000).await.unwrap();
    assert_eq!(text, "Analysis");
}

#[tokio::test]
async fn test_gemini_resource_exhausted_is_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "error": {
                "code": 429,
                "message": "Resource has been exhausted (e.g. check quota).",
                "status": "RESOURCE_EXHAUSTED"
            }
        })))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::Google, "gemini-2.0-flash");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::RateLimited);
}

#[tokio::test]
async fn test_gemini_server_error_is_transient() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/models/gemini-2.0-flash:generateContent"))
        .respond_with(ResponseTemplate::new(500).set_body_string("internal"))
        .mount(&server)
        .await;

    let backend = backend_for(&server, Provider::Google, "gemini-2.0-flash");
    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Transient);
}

#[tokio::test]
async fn test_unreachable_endpoint_is_transient() {
    let profile = ModelRegistry::new().resolve(Provider::OpenAi, "gpt-4o-2024-08-06");
    // Port 9 (discard) is closed on test hosts; connect fails immediately.
    let config = AdapterConfig::new(Provider::OpenAi)
        .with_api_key("test-key")
        .with_base_url("http://127.0.0.1:9")
        .with_timeout_secs(2);
    let backend = build_backend(profile, config).unwrap();

    let err = backend.generate("prompt", 100).await.unwrap_err();
    assert_eq!(err.class, FailureClass::Transient);
}

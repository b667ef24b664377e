//! Integration tests for the HTTP providers
//!
//! Runs the providers against a wiremock server. No real Ollama instance or
//! API key is needed.

use serde_json::json;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::{
    matchers::{body_partial_json, header, method, path},
    Mock, MockServer, ResponseTemplate,
};

use deepdive_engine::config::{LLMConfig, ProviderConfig};
use deepdive_engine::llm::anthropic::AnthropicProvider;
use deepdive_engine::llm::ollama::OllamaProvider;
use deepdive_engine::llm::openai::OpenAIProvider;
use deepdive_engine::llm::registry::ProviderRegistry;
use deepdive_engine::llm::{GenerationRequest, LLMError, LLMProvider, TextGenerator};
use deepdive_engine::secrets::{SecretCache, SecretManager};

fn request() -> GenerationRequest {
    GenerationRequest::new("", "You are an analyst.", "Explain TCP slow start.", 256, 0.3)
}

fn cache_with(key: &str, value: &str) -> Arc<SecretCache> {
    let cache = SecretCache::new(Arc::new(SecretManager::new("deepdive-test")));
    cache.insert(key, value);
    Arc::new(cache)
}

fn ollama_reply(text: &str) -> serde_json::Value {
    json!({
        "model": "llama3.1:8b",
        "message": { "role": "assistant", "content": text },
        "done": true
    })
}

#[tokio::test]
async fn test_ollama_generate() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .and(body_partial_json(json!({
            "model": "llama3.1:8b",
            "stream": false,
            "options": { "num_predict": 256 }
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("Slow start doubles cwnd.")))
        .expect(1)
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b");
    let text = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(text, "Slow start doubles cwnd.");
}

#[tokio::test]
async fn test_ollama_rate_limit_maps_to_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b");
    let err = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(matches!(err, LLMError::RateLimitExceeded));
}

#[tokio::test]
async fn test_ollama_connection_error() {
    // Nothing listens on port 9 on a test host
    let provider = OllamaProvider::new("http://127.0.0.1:9", "llama3.1:8b");
    let err = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();

    assert!(
        matches!(err, LLMError::ProviderUnavailable(_) | LLMError::NetworkError(_)),
        "unexpected error: {:?}",
        err
    );
    assert!(!err.is_cancellation());
}

#[tokio::test]
async fn test_cancel_interrupts_in_flight_request() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(ollama_reply("too late"))
                .set_delay(Duration::from_secs(10)),
        )
        .mount(&server)
        .await;

    let provider = OllamaProvider::new(server.uri(), "llama3.1:8b");
    let token = CancellationToken::new();
    let trigger = token.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let err = provider.generate(&request(), &token).await.unwrap_err();

    assert!(err.is_cancellation());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[tokio::test]
async fn test_openai_generate_and_auth_failure() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer test-openai-key"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "choices": [{ "message": { "role": "assistant", "content": "cwnd grows exponentially" } }]
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .mount(&server)
        .await;

    let config = ProviderConfig {
        base_url: server.uri(),
        ..ProviderConfig::openai()
    };

    let provider = OpenAIProvider::new(config.clone(), cache_with("openai_api_key", "test-openai-key"));
    let text = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "cwnd grows exponentially");

    let provider = OpenAIProvider::new(config, cache_with("openai_api_key", "wrong-key"));
    let err = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LLMError::AuthenticationFailed(_)));
}

#[tokio::test]
async fn test_anthropic_uses_top_level_system() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "test-anthropic-key"))
        .and(body_partial_json(json!({ "system": "You are an analyst." })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{ "type": "text", "text": "AIMD after loss" }]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let config = ProviderConfig {
        base_url: server.uri(),
        ..ProviderConfig::anthropic()
    };
    let provider = AnthropicProvider::new(config, cache_with("anthropic_api_key", "test-anthropic-key"));

    let text = provider
        .generate(&request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "AIMD after loss");
}

#[tokio::test]
async fn test_registry_routes_by_provider_id() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/chat"))
        .respond_with(ResponseTemplate::new(200).set_body_json(ollama_reply("routed")))
        .mount(&server)
        .await;

    let config = LLMConfig {
        ollama: ProviderConfig {
            base_url: server.uri(),
            ..ProviderConfig::ollama()
        },
        ..LLMConfig::default()
    };
    let registry = ProviderRegistry::from_config(&config, cache_with("unused", "unused"));

    let text = registry
        .generate("ollama", &request(), &CancellationToken::new())
        .await
        .unwrap();
    assert_eq!(text, "routed");

    let err = registry
        .generate("mistral", &request(), &CancellationToken::new())
        .await
        .unwrap_err();
    assert!(matches!(err, LLMError::UnknownProvider(_)));
}

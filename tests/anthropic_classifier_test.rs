//! Integration tests for the Anthropic classifier against a mock HTTP server.
//!
//! Covers request shape (headers, path), text/usage extraction and the
//! mapping of HTTP failures onto classifier errors.

use mockito::{Matcher, Server};
use taxonomist::adapters::classifiers::AnthropicClassifier;
use taxonomist::domain::errors::ClassifierError;
use taxonomist::domain::models::{ClassifierConfig, TokenUsage};
use taxonomist::domain::ports::ClassifierClient;

fn config(base_url: String) -> ClassifierConfig {
    ClassifierConfig {
        base_url,
        api_key: Some("test-key".to_string()),
        model: "test-model".to_string(),
        timeout_secs: 5,
        ..ClassifierConfig::default()
    }
}

fn success_body() -> String {
    serde_json::json!({
        "id": "msg_01ABC123",
        "type": "message",
        "role": "assistant",
        "content": [
            {"type": "text", "text": "[{\"domain\":\"Auth\","},
            {"type": "tool_use", "id": "t1", "name": "noop", "input": {}},
            {"type": "text", "text": "\"feature\":\"Login\"}]"}
        ],
        "model": "test-model",
        "stop_reason": "end_turn",
        "usage": {"input_tokens": 42, "output_tokens": 7}
    })
    .to_string()
}

#[tokio::test]
async fn test_call_success_with_mock() {
    let mut server = Server::new_async().await;
    let mock = server
        .mock("POST", "/v1/messages")
        .match_header("x-api-key", "test-key")
        .match_header("anthropic-version", "2023-06-01")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "test-model",
            "system": "classify",
            "messages": [{"role": "user", "content": "tests"}]
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(success_body())
        .create_async()
        .await;

    let client = AnthropicClassifier::from_config(&config(server.url())).unwrap();
    let response = client.call("classify", "tests").await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.text, r#"[{"domain":"Auth","feature":"Login"}]"#);
    assert_eq!(response.usage, TokenUsage::new(42, 7));
    assert_eq!(client.model_id(), "test-model");
}

#[tokio::test]
async fn test_rate_limited_maps_to_transient() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(429)
        .with_body(r#"{"type":"error","error":{"type":"rate_limit_error"}}"#)
        .create_async()
        .await;

    let client = AnthropicClassifier::from_config(&config(server.url())).unwrap();
    let err = client.call("s", "u").await.unwrap_err();

    assert_eq!(err, ClassifierError::RateLimited);
    assert!(err.is_transient());
}

#[tokio::test]
async fn test_unauthorized_maps_to_permanent() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(401)
        .with_body("invalid x-api-key")
        .create_async()
        .await;

    let client = AnthropicClassifier::from_config(&config(server.url())).unwrap();
    let err = client.call("s", "u").await.unwrap_err();

    assert!(matches!(err, ClassifierError::Authentication(ref body) if body.contains("invalid")));
    assert!(err.is_permanent());
}

#[tokio::test]
async fn test_overloaded_maps_to_server_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(529)
        .with_body("overloaded")
        .create_async()
        .await;

    let client = AnthropicClassifier::from_config(&config(server.url())).unwrap();
    let err = client.call("s", "u").await.unwrap_err();

    assert!(matches!(err, ClassifierError::Server { status: 529, .. }));
}

#[tokio::test]
async fn test_unreadable_body_is_an_error() {
    let mut server = Server::new_async().await;
    let _mock = server
        .mock("POST", "/v1/messages")
        .with_status(200)
        .with_body("<html>gateway</html>")
        .create_async()
        .await;

    let client = AnthropicClassifier::from_config(&config(server.url())).unwrap();
    assert!(matches!(
        client.call("s", "u").await,
        Err(ClassifierError::Network(_))
    ));
}

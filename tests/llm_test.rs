//! Chat-completion client against a mock endpoint

use kakuhyo::llm::{ChatCompletion, LlmClient, LlmConfig, SYSTEM_PROMPT};
use kakuhyo::utils::error::LlmError;
use kakuhyo::utils::retry::RetryConfig;
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client(server: &MockServer, max_retries: u32) -> LlmClient {
    LlmClient::with_config(LlmConfig {
        api_key: Some("sk-test".to_string()),
        endpoint: server.uri(),
        ..Default::default()
    })
    .unwrap()
    .with_retry_config(RetryConfig::with_delays(max_retries, 10, 50))
}

fn completion(content: &str) -> serde_json::Value {
    json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{
            "index": 0,
            "message": {"role": "assistant", "content": content},
            "finish_reason": "stop"
        }]
    })
}

#[tokio::test]
async fn test_complete_sends_request() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .and(header("authorization", "Bearer sk-test"))
        .and(body_partial_json(json!({
            "model": "deepseek-chat",
            "max_tokens": 1000
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("評価です")))
        .expect(1)
        .mount(&server)
        .await;

    let reply = client(&server, 0)
        .complete(SYSTEM_PROMPT, "作品を評価してください")
        .await
        .unwrap();
    assert_eq!(reply, "評価です");

    let requests = server.received_requests().await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&requests[0].body).unwrap();
    assert_eq!(body["messages"][0]["role"], "system");
    assert_eq!(body["messages"][0]["content"], SYSTEM_PROMPT);
    assert_eq!(body["messages"][1]["role"], "user");
    assert_eq!(body["messages"][1]["content"], "作品を評価してください");
}

#[tokio::test]
async fn test_server_error_is_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(completion("ok")))
        .mount(&server)
        .await;

    let reply = client(&server, 2).complete(SYSTEM_PROMPT, "p").await.unwrap();
    assert_eq!(reply, "ok");
}

#[tokio::test]
async fn test_unauthorized_is_final() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(401).set_body_string("invalid api key"))
        .expect(1)
        .mount(&server)
        .await;

    let err = client(&server, 3)
        .complete(SYSTEM_PROMPT, "p")
        .await
        .unwrap_err();

    match err {
        LlmError::Status { status, body } => {
            assert_eq!(status, 401);
            assert_eq!(body, "invalid api key");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[tokio::test]
async fn test_empty_choices() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/chat/completions"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"choices": []})))
        .mount(&server)
        .await;

    let err = client(&server, 0)
        .complete(SYSTEM_PROMPT, "p")
        .await
        .unwrap_err();
    assert!(matches!(err, LlmError::EmptyResponse));
}

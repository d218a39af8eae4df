use super::*;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn config_for(endpoint: &str) -> OpenAiConfig {
    OpenAiConfig {
        endpoint: endpoint.to_string(),
        api_key: "test-key".to_string(),
        ..OpenAiConfig::default()
    }
}

fn client_for(server: &MockServer) -> AzureOpenAiClient {
    AzureOpenAiClient::new(&config_for(&server.uri()))
        .expect("client should build")
        .with_timeout(Duration::from_secs(5))
}

#[test]
fn deployment_url_layout() {
    let client = AzureOpenAiClient::new(&config_for("https://example.openai.azure.com/"))
        .expect("client should build");

    let url = client
        .deployment_url("GPT-4", &["chat", "completions"])
        .expect("url should build");
    assert_eq!(
        url.as_str(),
        "https://example.openai.azure.com/openai/deployments/GPT-4/chat/completions?api-version=2024-12-01-preview"
    );

    let url = client
        .deployment_url("my model", &["embeddings"])
        .expect("url should build");
    assert_eq!(url.path(), "/openai/deployments/my%20model/embeddings");
}

#[test]
fn invalid_endpoint_rejected() {
    assert!(AzureOpenAiClient::new(&config_for("")).is_err());
    assert!(AzureOpenAiClient::new(&config_for("not a url")).is_err());
}

#[test]
fn long_error_bodies_are_truncated() {
    let body = "x".repeat(2000);
    let truncated = truncate_body(&body);
    assert_eq!(truncated.len(), MAX_ERROR_BODY_CHARS + 3);
    assert!(truncated.ends_with("..."));
    assert_eq!(truncate_body("  short  "), "short");
}

#[tokio::test]
async fn embedding_request_and_response() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/text-embedding-ada-002/embeddings"))
        .and(query_param("api-version", "2024-12-01-preview"))
        .and(header("api-key", "test-key"))
        .and(body_json(serde_json::json!({"input": ["hello world"]})))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "object": "list",
            "data": [{"object": "embedding", "index": 0, "embedding": [0.25, -0.5, 1.0]}],
            "model": "text-embedding-ada-002"
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let embedding = tokio::task::spawn_blocking(move || {
        client.embed("text-embedding-ada-002", "hello world")
    })
    .await
    .expect("task should join")
    .expect("embedding should succeed");

    assert_eq!(embedding, vec![0.25, -0.5, 1.0]);
}

#[tokio::test]
async fn embedding_server_error_reports_status() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(
            ResponseTemplate::new(500).set_body_string(r#"{"error":{"message":"overloaded"}}"#),
        )
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.embed("ada", "hello"))
        .await
        .expect("task should join");

    let err = result.expect_err("server error should fail");
    let message = format!("{err:#}");
    assert!(message.contains("HTTP 500"), "unexpected error: {message}");
    assert!(message.contains("overloaded"), "unexpected error: {message}");
}

#[tokio::test]
async fn embedding_without_data_is_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"data": []})))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let result = tokio::task::spawn_blocking(move || client.embed("ada", "hello"))
        .await
        .expect("task should join");

    assert!(result.is_err());
}

#[tokio::test]
async fn chat_completion_sends_history() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/openai/deployments/GPT-4/chat/completions"))
        .and(header("api-key", "test-key"))
        .and(body_partial_json(serde_json::json!({
            "messages": [
                {"role": "system", "content": "You write TypeScript tests."},
                {"role": "user", "content": "Generate code for the test cases."}
            ]
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": "```typescript\nit('works');\n```"}}
            ]
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = ChatHistory::new()
        .with(ChatEntry::system("You write TypeScript tests."))
        .with(ChatEntry::user("Generate code for the test cases."));

    let reply = tokio::task::spawn_blocking(move || {
        client.complete("GPT-4", &history, SamplingParams::PRECISE)
    })
    .await
    .expect("task should join")
    .expect("completion should succeed");

    assert_eq!(reply, "```typescript\nit('works');\n```");
}

#[tokio::test]
async fn chat_completion_without_content_is_chat_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "choices": [{"index": 0, "message": {"role": "assistant", "content": null}}]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = ChatHistory::new().with(ChatEntry::user("hi"));

    let result = tokio::task::spawn_blocking(move || {
        client.complete("GPT-35-Turbo", &history, SamplingParams::default())
    })
    .await
    .expect("task should join");

    assert!(matches!(result, Err(TestGenError::ChatCompletion(_))));
}

#[tokio::test]
async fn chat_completion_client_error_is_not_retried() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .respond_with(ResponseTemplate::new(404).set_body_string("DeploymentNotFound"))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server);
    let history = ChatHistory::new().with(ChatEntry::user("hi"));

    let result = tokio::task::spawn_blocking(move || {
        client.complete("missing", &history, SamplingParams::default())
    })
    .await
    .expect("task should join");

    let err = result.expect_err("404 should fail");
    assert!(format!("{:#}", anyhow::Error::from(err)).contains("HTTP 404"));
}

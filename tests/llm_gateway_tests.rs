use std::path::PathBuf;

use doccrawl::config::ProviderConfig;
use doccrawl::llm::LlmGateway;

fn config_for(server: &mockito::ServerGuard) -> ProviderConfig {
    ProviderConfig {
        data_root: PathBuf::from("/tmp"),
        ollama_url: server.url(),
        openrouter_url: "https://openrouter.invalid".to_string(),
        openrouter_api_key: None,
        opencode_url: "https://opencode.invalid".to_string(),
        opencode_api_key: None,
    }
}

#[tokio::test]
async fn validate_model_accepts_known_ollama_tag() {
    let mut server = mockito::Server::new_async().await;
    let _tags = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"models":[{"name":"llama3:latest","size":123}]}"#)
        .create_async()
        .await;

    let gateway = LlmGateway::new(reqwest::Client::new(), config_for(&server));
    assert!(gateway.validate_model("llama3").await.is_ok());
}

#[tokio::test]
async fn validate_model_rejects_unknown_tag() {
    let mut server = mockito::Server::new_async().await;
    let _tags = server
        .mock("GET", "/api/tags")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"models":[{"name":"mistral:latest","size":1}]}"#)
        .create_async()
        .await;

    let gateway = LlmGateway::new(reqwest::Client::new(), config_for(&server));
    assert!(gateway.validate_model("llama3").await.is_err());
}

#[tokio::test]
async fn filter_urls_intersects_model_response_with_input() {
    let mut server = mockito::Server::new_async().await;
    let _generate = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"[\"https://docs.example.com/guide/intro\"]"}"#)
        .create_async()
        .await;

    let gateway = LlmGateway::new(reqwest::Client::new(), config_for(&server));
    let urls = vec![
        "https://docs.example.com/guide/intro".to_string(),
        "https://docs.example.com/guide/changelog".to_string(),
    ];
    let filtered = gateway.filter_urls(&urls, "llama3").await;
    assert_eq!(filtered, vec!["https://docs.example.com/guide/intro".to_string()]);
}

#[tokio::test]
async fn filter_urls_falls_back_to_input_on_provider_failure() {
    let mut server = mockito::Server::new_async().await;
    let _generate = server
        .mock("POST", "/api/generate")
        .with_status(500)
        .expect_at_least(1)
        .create_async()
        .await;

    let gateway = LlmGateway::new(reqwest::Client::new(), config_for(&server));
    let urls = vec!["https://docs.example.com/guide/intro".to_string()];
    let filtered = gateway.filter_urls(&urls, "llama3").await;
    assert_eq!(filtered, urls);
}

#[tokio::test]
async fn cleanup_returns_model_response() {
    let mut server = mockito::Server::new_async().await;
    let _generate = server
        .mock("POST", "/api/generate")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(r#"{"response":"cleaned body"}"#)
        .create_async()
        .await;

    let gateway = LlmGateway::new(reqwest::Client::new(), config_for(&server));
    let result = gateway.cleanup("raw body with cookie notice", "llama3").await;
    assert_eq!(result, "cleaned body");
}

/*!
 * Tests for provider construction and request shaping
 */

use std::time::Duration;
use serde_json::json;
use subclean::app_config::{ProviderConfig, ProviderKind};
use subclean::errors::ProviderError;
use subclean::providers::openai::{OpenAI, OpenAIRequest, OpenAIResponse};
use subclean::providers::{create_provider, Provider};

fn alibaba_config() -> ProviderConfig {
    let mut config = ProviderConfig::new("alibaba", ProviderKind::OpenAI);
    config.base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1/".to_string();
    config.model = "qwen-plus".to_string();
    config.extra_params.insert("enable_search".to_string(), json!(true));
    config
}

/// Test that the OpenAI-compatible client targets the configured base URL
#[test]
fn test_openai_fromConfig_shouldBuildCompletionsUrl() {
    let client = OpenAI::from_config(&alibaba_config(), "sk-test".to_string()).unwrap();

    assert_eq!(
        client.completions_url(),
        "https://dashscope.aliyuncs.com/compatible-mode/v1/chat/completions"
    );
    assert_eq!(client.name(), "alibaba");
    assert_eq!(client.model(), "qwen-plus");
}

/// Test that extra params are merged into the request body next to the standard fields
#[test]
fn test_openai_buildBody_shouldMergeExtraParams() {
    let client = OpenAI::from_config(&alibaba_config(), "sk-test".to_string()).unwrap();
    let request = OpenAIRequest::new("qwen-plus")
        .add_message("user", "hello")
        .temperature(0.7)
        .max_tokens(4000);

    let body = client.build_body(&request).unwrap();

    assert_eq!(body["model"], json!("qwen-plus"));
    assert_eq!(body["messages"][0]["content"], json!("hello"));
    assert_eq!(body["max_tokens"], json!(4000));
    assert_eq!(body["enable_search"], json!(true));
}

/// Test that blank completions are not treated as text
#[test]
fn test_openai_extractText_withBlankContent_shouldBeNone() {
    let response: OpenAIResponse = serde_json::from_value(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "  "}}]
    }))
    .unwrap();
    assert_eq!(OpenAI::extract_text_from_response(&response), None);

    let response: OpenAIResponse = serde_json::from_value(json!({
        "choices": [{"index": 0, "message": {"role": "assistant", "content": "Clean text."}}]
    }))
    .unwrap();
    assert_eq!(OpenAI::extract_text_from_response(&response), Some("Clean text.".to_string()));
}

/// Test that an unreachable backend surfaces as a provider error rather than a panic
#[tokio::test]
async fn test_openai_execute_withUnreachableHost_shouldReturnProviderError() {
    let client = OpenAI::new("local", "m", "", "http://127.0.0.1:1/v1", Duration::from_secs(2)).unwrap();

    let err = client.execute("hi", 0.7, 16).await.unwrap_err();

    assert!(matches!(
        err,
        ProviderError::ConnectionError(_) | ProviderError::RequestFailed(_)
    ));
}

/// Test that a bad base URL is rejected at construction
#[test]
fn test_createProvider_withRelativeBaseUrl_shouldBeInvalidEndpoint() {
    let mut config = ProviderConfig::new("local", ProviderKind::Ollama);
    config.base_url = "localhost:11434".to_string();
    config.model = "llama3".to_string();

    let err = create_provider(&config).unwrap_err();
    assert!(matches!(err, ProviderError::InvalidEndpoint(_)));
}

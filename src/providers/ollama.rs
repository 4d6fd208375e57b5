use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use log::{debug, error};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use super::{Provider, merge_extra_params};

/// Ollama client for interacting with Ollama API
pub struct Ollama {
    /// Provider name from the configuration
    name: String,
    /// Model identifier
    model: String,
    /// Base URL of the Ollama API
    base_url: String,
    /// HTTP client for making requests
    client: Client,
    /// Backend-specific parameters merged into every request
    extra_params: BTreeMap<String, Value>,
}

impl std::fmt::Debug for Ollama {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Ollama")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

// @const: Extra parameters that belong in the request's `options` object
const OPTION_KEYS: &[&str] = &[
    "temperature",
    "num_predict",
    "num_ctx",
    "num_keep",
    "num_batch",
    "num_gpu",
    "num_thread",
    "top_k",
    "top_p",
    "min_p",
    "typical_p",
    "tfs_z",
    "repeat_last_n",
    "repeat_penalty",
    "presence_penalty",
    "frequency_penalty",
    "mirostat",
    "mirostat_tau",
    "mirostat_eta",
    "penalize_newline",
    "seed",
    "stop",
];

/// Generation options for the Ollama API
#[derive(Debug, Serialize, Deserialize)]
pub struct GenerationOptions {
    /// Temperature for generation (default: 0.8)
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    num_predict: Option<u32>,
}

/// Chat message object
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    /// Role of the message sender (system, user, assistant, or tool)
    pub role: String,
    /// Content of the message
    pub content: String,
}

/// Chat request for the Ollama API
#[derive(Debug, Serialize)]
pub struct ChatRequest {
    /// Model name to use for generation
    model: String,
    /// Messages of the conversation
    messages: Vec<ChatMessage>,
    /// Additional model parameters
    #[serde(skip_serializing_if = "Option::is_none")]
    options: Option<GenerationOptions>,
    /// Whether to stream the response
    stream: bool,
}

/// Chat response from the Ollama API
#[derive(Debug, Deserialize)]
pub struct ChatResponse {
    /// Model name
    #[serde(default)]
    pub model: String,
    /// Response message
    pub message: ChatMessage,
    /// Whether the generation is complete
    #[serde(default)]
    pub done: bool,
    /// Number of prompt tokens
    #[serde(default)]
    pub prompt_eval_count: Option<u64>,
    /// Number of generated tokens
    #[serde(default)]
    pub eval_count: Option<u64>,
}

impl ChatRequest {
    /// Create a new non-streaming chat request
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self {
            model: model.into(),
            messages,
            options: None,
            stream: false,
        }
    }

    /// Set the temperature and token budget
    pub fn options(mut self, temperature: f32, num_predict: u32) -> Self {
        self.options = Some(GenerationOptions {
            temperature: Some(temperature),
            num_predict: Some(num_predict),
        });
        self
    }
}

impl Ollama {
    /// Create a new Ollama client
    ///
    /// Ollama speaks HTTP/1.1 only, so the client is pinned to it.
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .http1_only()
            .pool_idle_timeout(Duration::from_secs(90))
            .tcp_keepalive(Duration::from_secs(60))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            model: model.into(),
            base_url: base_url.into(),
            client,
            extra_params: BTreeMap::new(),
        })
    }

    /// Create a client from a provider definition
    pub fn from_config(config: &ProviderConfig) -> Result<Self, ProviderError> {
        let base_url = if config.base_url.is_empty() {
            "http://localhost:11434".to_string()
        } else {
            super::validate_base_url(&config.name, &config.base_url)?
        };
        let mut client = Self::new(&config.name, &config.model, base_url, config.timeout())?;
        client.extra_params = config.extra_params.clone();
        Ok(client)
    }

    /// Full URL of the chat endpoint
    pub fn chat_url(&self) -> String {
        format!("{}/api/chat", self.base_url.trim_end_matches('/'))
    }

    /// Request body with extra parameters merged in
    ///
    /// Model parameters (`num_ctx`, `top_p`, ...) go under `options`, where
    /// Ollama reads them; everything else (`keep_alive`, `format`) stays at
    /// the top level.
    pub fn build_body(&self, request: &ChatRequest) -> Result<Value, ProviderError> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to serialize request: {}", e)))?;

        let (option_params, top_level): (BTreeMap<String, Value>, BTreeMap<String, Value>) = self
            .extra_params
            .clone()
            .into_iter()
            .partition(|(key, _)| OPTION_KEYS.contains(&key.as_str()));

        merge_extra_params(&mut body, &top_level);
        if !option_params.is_empty() {
            if let Value::Object(map) = &mut body {
                let options = map
                    .entry("options")
                    .or_insert_with(|| Value::Object(serde_json::Map::new()));
                merge_extra_params(options, &option_params);
            }
        }
        Ok(body)
    }

    /// Send a chat request
    pub async fn chat(&self, request: ChatRequest) -> Result<ChatResponse, ProviderError> {
        let body = self.build_body(&request)?;

        let response = self.client.post(self.chat_url())
            .json(&body)
            .send()
            .await
            .map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("Ollama API error ({}): {}", status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let chat_response = response.json::<ChatResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse Ollama response: {}", e)))?;

        debug!(
            "{} ({}) evaluated {} prompt tokens, generated {}",
            self.name,
            chat_response.model,
            chat_response.prompt_eval_count.unwrap_or(0),
            chat_response.eval_count.unwrap_or(0)
        );

        Ok(chat_response)
    }
}

#[async_trait]
impl Provider for Ollama {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn execute(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, ProviderError> {
        let request = ChatRequest::new(
            &self.model,
            vec![ChatMessage { role: "user".to_string(), content: prompt.to_string() }],
        )
        .options(temperature, max_tokens);

        let response = self.chat(request).await?;
        if !response.done || response.message.content.trim().is_empty() {
            return Err(ProviderError::EmptyResponse(format!("{} returned an incomplete message", self.name)));
        }
        Ok(response.message.content)
    }
}

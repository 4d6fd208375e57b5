use std::collections::BTreeMap;
use std::time::Duration;
use async_trait::async_trait;
use serde::{Serialize, Deserialize};
use serde_json::Value;
use reqwest::Client;
use log::{debug, error};

use crate::app_config::ProviderConfig;
use crate::errors::ProviderError;
use super::{Provider, merge_extra_params};

/// Client for any OpenAI-compatible chat completions API
pub struct OpenAI {
    /// Provider name from the configuration
    name: String,
    /// Model identifier
    model: String,
    /// HTTP client for API requests
    client: Client,
    /// API key for authentication
    api_key: String,
    /// Base URL ending in the API version segment, e.g. `https://api.openai.com/v1`
    endpoint: String,
    /// Backend-specific parameters merged into every request
    extra_params: BTreeMap<String, Value>,
}

impl std::fmt::Debug for OpenAI {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAI")
            .field("name", &self.name)
            .field("model", &self.model)
            .field("endpoint", &self.endpoint)
            .finish()
    }
}

/// Chat completions request
#[derive(Debug, Serialize)]
pub struct OpenAIRequest {
    /// The model to use
    model: String,

    /// The messages for the conversation
    messages: Vec<OpenAIMessage>,

    /// Temperature for generation
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,

    /// Maximum number of tokens to generate
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,

    /// Always false; responses are read in one piece
    stream: bool,
}

/// Chat message
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OpenAIMessage {
    /// Role of the message sender (system, user, assistant)
    pub role: String,

    /// Content of the message; some backends send null for refusals
    #[serde(default)]
    pub content: Option<String>,
}

/// One completion choice
#[derive(Debug, Deserialize)]
pub struct OpenAIChoice {
    /// The generated message
    pub message: OpenAIMessage,
    /// Why generation stopped
    #[serde(default)]
    pub finish_reason: Option<String>,
}

/// Token usage information
#[derive(Debug, Deserialize)]
pub struct OpenAIUsage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Chat completions response
#[derive(Debug, Deserialize)]
pub struct OpenAIResponse {
    /// Completion choices
    #[serde(default)]
    pub choices: Vec<OpenAIChoice>,
    /// Token usage information
    #[serde(default)]
    pub usage: Option<OpenAIUsage>,
}

impl OpenAIRequest {
    /// Create a new request for the given model
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            messages: Vec::new(),
            temperature: None,
            max_tokens: None,
            stream: false,
        }
    }

    /// Add a message to the request
    pub fn add_message(mut self, role: impl Into<String>, content: impl Into<String>) -> Self {
        self.messages.push(OpenAIMessage {
            role: role.into(),
            content: Some(content.into()),
        });
        self
    }

    /// Set the temperature
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    /// Set the completion token budget
    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

impl OpenAI {
    /// Create a new client
    pub fn new(
        name: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, ProviderError> {
        let client = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(15))
            .pool_idle_timeout(Duration::from_secs(90))
            .build()
            .map_err(|e| ProviderError::ConnectionError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            name: name.into(),
            model: model.into(),
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            extra_params: BTreeMap::new(),
        })
    }

    /// Create a client from a provider definition
    pub fn from_config(config: &ProviderConfig, api_key: String) -> Result<Self, ProviderError> {
        let endpoint = if config.base_url.is_empty() {
            "https://api.openai.com/v1".to_string()
        } else {
            super::validate_base_url(&config.name, &config.base_url)?
        };
        let mut client = Self::new(&config.name, &config.model, api_key, endpoint, config.timeout())?;
        client.extra_params = config.extra_params.clone();
        Ok(client)
    }

    /// Full URL of the chat completions endpoint
    pub fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.endpoint.trim_end_matches('/'))
    }

    /// Request body with extra parameters merged in
    pub fn build_body(&self, request: &OpenAIRequest) -> Result<Value, ProviderError> {
        let mut body = serde_json::to_value(request)
            .map_err(|e| ProviderError::RequestFailed(format!("Failed to serialize request: {}", e)))?;
        merge_extra_params(&mut body, &self.extra_params);
        Ok(body)
    }

    /// Complete a chat request
    pub async fn complete(&self, request: OpenAIRequest) -> Result<OpenAIResponse, ProviderError> {
        let body = self.build_body(&request)?;

        let mut builder = self.client.post(self.completions_url())
            .header("Content-Type", "application/json")
            .json(&body);
        if !self.api_key.is_empty() {
            builder = builder.bearer_auth(&self.api_key);
        }

        let response = builder.send().await.map_err(ProviderError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await
                .unwrap_or_else(|_| "Failed to get error response text".to_string());
            error!("{} API error ({}): {}", self.name, status, error_text);
            return Err(ProviderError::from_status(status.as_u16(), error_text));
        }

        let completion = response.json::<OpenAIResponse>().await
            .map_err(|e| ProviderError::ParseError(format!("Failed to parse {} response: {}", self.name, e)))?;

        if let Some(usage) = &completion.usage {
            debug!("{} token usage: {} prompt, {} completion", self.name, usage.prompt_tokens, usage.completion_tokens);
        }

        Ok(completion)
    }

    /// Extract text from a response
    pub fn extract_text_from_response(response: &OpenAIResponse) -> Option<String> {
        response.choices.first()
            .and_then(|choice| choice.message.content.clone())
            .filter(|text| !text.trim().is_empty())
    }
}

#[async_trait]
impl Provider for OpenAI {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn execute(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, ProviderError> {
        let request = OpenAIRequest::new(&self.model)
            .add_message("user", prompt)
            .temperature(temperature)
            .max_tokens(max_tokens);

        let response = self.complete(request).await?;
        Self::extract_text_from_response(&response)
            .ok_or_else(|| ProviderError::EmptyResponse(format!("{} returned no message content", self.name)))
    }
}

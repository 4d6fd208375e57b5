use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::default::Default;
use std::path::Path;
use std::time::Duration;

use crate::processing::policy::{RateWindow, RetryPolicy};
use crate::processing::prompts::PromptTemplate;

/// Application configuration module
/// This module handles the application configuration including loading,
/// validating and saving configuration settings.
/// Represents the application configuration
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Config {
    /// Ordered provider definitions; order is fallback priority
    #[serde(default = "default_providers")]
    pub providers: Vec<ProviderConfig>,

    /// Pacing and retry settings
    #[serde(default)]
    pub rate_limit: RateLimitConfig,

    /// Prompt and output settings
    #[serde(default)]
    pub processing: ProcessingConfig,

    /// Log level
    #[serde(default)]
    pub log_level: LogLevel,
}

/// Backend family of a provider
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    // @provider: OpenAI-compatible chat completions (siliconflow, alibaba, openai, lmstudio)
    #[default]
    OpenAI,
    // @provider: Anthropic messages API
    Anthropic,
    // @provider: Ollama local server
    Ollama,
}

impl ProviderKind {
    // @returns: Capitalized provider family name
    pub fn display_name(&self) -> &str {
        match self {
            Self::OpenAI => "OpenAI-compatible",
            Self::Anthropic => "Anthropic",
            Self::Ollama => "Ollama",
        }
    }

    // @returns: Lowercase provider family identifier
    pub fn to_lowercase_string(&self) -> String {
        match self {
            Self::OpenAI => "openai".to_string(),
            Self::Anthropic => "anthropic".to_string(),
            Self::Ollama => "ollama".to_string(),
        }
    }

    /// Whether requests to this family carry an API key
    pub fn requires_api_key(&self) -> bool {
        !matches!(self, Self::Ollama)
    }

    /// Infer the family from a well-known provider name
    pub fn from_provider_name(name: &str) -> Option<Self> {
        match name.to_lowercase().as_str() {
            "siliconflow" | "alibaba" | "dashscope" | "openai" | "deepseek" | "lmstudio" => {
                Some(Self::OpenAI)
            }
            "anthropic" | "claude" => Some(Self::Anthropic),
            "ollama" => Some(Self::Ollama),
            _ => None,
        }
    }
}

// Implement Display trait for ProviderKind
impl std::fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.to_lowercase_string())
    }
}

// Implement FromStr trait for ProviderKind
impl std::str::FromStr for ProviderKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "openai" | "openai-compatible" => Ok(Self::OpenAI),
            "anthropic" => Ok(Self::Anthropic),
            "ollama" => Ok(Self::Ollama),
            _ => Err(anyhow!("Invalid provider type: {}", s)),
        }
    }
}

/// Provider definition as written in the configuration file
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProviderConfig {
    // @field: Provider identity, also used in logs and reports
    pub name: String,

    // @field: Backend family; inferred from the name when absent
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub provider_type: Option<String>,

    // @field: Service URL
    #[serde(default = "String::new")]
    pub base_url: String,

    // @field: Model name
    #[serde(default = "String::new")]
    pub model: String,

    // @field: Environment variable holding the API key
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key_env: Option<String>,

    // @field: Backend-specific parameters merged into every request body
    // (for Ollama, model options such as num_ctx or top_p go under `options`)
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub extra_params: BTreeMap<String, serde_json::Value>,

    // @field: Disabled providers are never constructed
    #[serde(default = "default_true")]
    pub enabled: bool,

    // @field: Timeout seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderConfig {
    // @param name: Provider name
    // @param kind: Backend family
    // @returns: Provider config with defaults for the family
    pub fn new(name: impl Into<String>, kind: ProviderKind) -> Self {
        let base_url = match kind {
            ProviderKind::OpenAI => default_openai_base_url(),
            ProviderKind::Anthropic => default_anthropic_base_url(),
            ProviderKind::Ollama => default_ollama_base_url(),
        };
        Self {
            name: name.into(),
            provider_type: Some(kind.to_lowercase_string()),
            base_url,
            model: String::new(),
            api_key_env: None,
            extra_params: BTreeMap::new(),
            enabled: true,
            timeout_secs: default_timeout_secs(),
        }
    }

    /// Resolve the backend family from `type`, falling back to the provider name
    pub fn kind(&self) -> Option<ProviderKind> {
        match &self.provider_type {
            Some(t) => t.parse().ok(),
            None => ProviderKind::from_provider_name(&self.name),
        }
    }

    /// The raw type identifier, for error messages
    pub fn type_label(&self) -> String {
        self.provider_type.clone().unwrap_or_else(|| self.name.clone())
    }

    /// Environment variable holding the API key (`<NAME>_API_KEY` unless overridden)
    pub fn api_key_env_var(&self) -> String {
        self.api_key_env.clone().unwrap_or_else(|| {
            let name: String = self
                .name
                .chars()
                .map(|c| if c.is_ascii_alphanumeric() { c.to_ascii_uppercase() } else { '_' })
                .collect();
            format!("{}_API_KEY", name)
        })
    }

    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs.max(1))
    }
}

/// Pacing and retry settings shared by every provider
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct RateLimitConfig {
    /// Request budget per minute across independent dispatches
    #[serde(default = "default_requests_per_minute")]
    pub requests_per_minute: u32,

    /// Attempts per provider before falling back to the next one
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Pause between attempts on the same provider
    #[serde(default = "default_retry_delay_seconds")]
    pub retry_delay_seconds: f64,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_minute: default_requests_per_minute(),
            max_retries: default_max_retries(),
            retry_delay_seconds: default_retry_delay_seconds(),
        }
    }
}

impl RateLimitConfig {
    /// Retry policy for the dispatcher
    pub fn retry_policy(&self) -> RetryPolicy {
        // NaN and negatives become zero; values past Duration's range saturate
        let delay = Duration::try_from_secs_f64(self.retry_delay_seconds.max(0.0))
            .unwrap_or(Duration::MAX);
        RetryPolicy::new(self.max_retries, delay)
    }

    /// Minimum delay between independent dispatches
    pub fn rate_window(&self) -> RateWindow {
        RateWindow::from_requests_per_minute(self.requests_per_minute)
    }
}

/// Prompt and output settings
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct ProcessingConfig {
    /// Prompt template; `{content}` is replaced with the transcript text
    #[serde(default = "default_prompt")]
    pub prompt: String,

    /// Prepend `# <file stem>` to each output
    #[serde(default = "default_true")]
    pub include_filename_as_title: bool,

    /// Texts longer than this many characters are split into chunks
    #[serde(default = "default_max_chunk_size")]
    pub max_chunk_size: usize,

    /// Temperature parameter for text generation
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Completion token budget per request
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,
}

impl Default for ProcessingConfig {
    fn default() -> Self {
        Self {
            prompt: default_prompt(),
            include_filename_as_title: true,
            max_chunk_size: default_max_chunk_size(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
        }
    }
}

/// Log verbosity level
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Error,
    Warn,
    #[default]
    Info,
    Debug,
    Trace,
}

impl LogLevel {
    /// Matching `log` filter
    pub fn to_level_filter(&self) -> log::LevelFilter {
        match self {
            Self::Error => log::LevelFilter::Error,
            Self::Warn => log::LevelFilter::Warn,
            Self::Info => log::LevelFilter::Info,
            Self::Debug => log::LevelFilter::Debug,
            Self::Trace => log::LevelFilter::Trace,
        }
    }
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_requests_per_minute() -> u32 {
    10
}

fn default_max_retries() -> u32 {
    3
}

fn default_retry_delay_seconds() -> f64 {
    2.0
}

fn default_max_chunk_size() -> usize {
    12000
}

fn default_temperature() -> f32 {
    0.7
}

fn default_max_tokens() -> u32 {
    4000
}

fn default_true() -> bool {
    true
}

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_anthropic_base_url() -> String {
    "https://api.anthropic.com".to_string()
}

fn default_ollama_base_url() -> String {
    "http://localhost:11434".to_string()
}

fn default_prompt() -> String {
    "The following is a raw transcript extracted from a subtitle file. \
     Rewrite it as clean, readable prose: fix punctuation, merge broken lines into \
     paragraphs and remove filler words, without adding or dropping content.\n\n{content}"
        .to_string()
}

fn default_providers() -> Vec<ProviderConfig> {
    let mut siliconflow = ProviderConfig::new("siliconflow", ProviderKind::OpenAI);
    siliconflow.base_url = "https://api.siliconflow.cn/v1".to_string();
    siliconflow.model = "Qwen/Qwen2.5-7B-Instruct".to_string();

    let mut alibaba = ProviderConfig::new("alibaba", ProviderKind::OpenAI);
    alibaba.base_url = "https://dashscope.aliyuncs.com/compatible-mode/v1".to_string();
    alibaba.model = "qwen-plus".to_string();
    alibaba.api_key_env = Some("DASHSCOPE_API_KEY".to_string());

    vec![siliconflow, alibaba]
}

/// Placeholder substituted with the transcript text
pub const CONTENT_PLACEHOLDER: &str = "{content}";

impl Config {
    /// Load a configuration file; `.json` files are parsed as JSON, anything else as YAML
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to open config file: {:?}", path))?;
        Self::parse(&content, is_json_path(path))
            .with_context(|| format!("Failed to parse config file: {:?}", path))
    }

    /// Parse configuration text
    pub fn parse(content: &str, json: bool) -> Result<Self> {
        let config = if json {
            serde_json::from_str(content)?
        } else {
            serde_yaml::from_str(content)?
        };
        Ok(config)
    }

    /// Write the configuration, using the format implied by the extension
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let path = path.as_ref();
        let text = if is_json_path(path) {
            serde_json::to_string_pretty(self).context("Failed to serialize config to JSON")?
        } else {
            serde_yaml::to_string(self).context("Failed to serialize config to YAML")?
        };
        std::fs::write(path, text)
            .with_context(|| format!("Failed to write config to file: {:?}", path))
    }

    /// Validate the configuration for consistency and required values
    pub fn validate(&self) -> Result<()> {
        if self.providers.is_empty() {
            return Err(anyhow!("At least one provider must be configured"));
        }

        for provider in &self.providers {
            if provider.name.trim().is_empty() {
                return Err(anyhow!("Provider name cannot be empty"));
            }
            if provider.enabled && provider.model.trim().is_empty() {
                return Err(anyhow!("Model is required for provider '{}'", provider.name));
            }
        }

        PromptTemplate::new(&self.processing.prompt)
            .with_context(|| format!("Prompt template must contain the {} placeholder", CONTENT_PLACEHOLDER))?;

        if self.processing.max_chunk_size == 0 {
            return Err(anyhow!("max_chunk_size must be greater than zero"));
        }

        if self.rate_limit.max_retries == 0 {
            return Err(anyhow!("max_retries must be at least 1"));
        }

        let retry_delay = self.rate_limit.retry_delay_seconds;
        if !retry_delay.is_finite() || retry_delay < 0.0 || Duration::try_from_secs_f64(retry_delay).is_err() {
            return Err(anyhow!(
                "retry_delay_seconds must be a non-negative number of seconds, got {}",
                retry_delay
            ));
        }

        if !(0.0..=2.0).contains(&self.processing.temperature) {
            return Err(anyhow!(
                "temperature must be between 0.0 and 2.0, got {}",
                self.processing.temperature
            ));
        }

        Ok(())
    }

    /// Providers that are switched on, in priority order
    pub fn enabled_providers(&self) -> impl Iterator<Item = &ProviderConfig> {
        self.providers.iter().filter(|p| p.enabled)
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension()
        .is_some_and(|ext| ext.to_string_lossy().eq_ignore_ascii_case("json"))
}

/// Default implementation for Config
impl Default for Config {
    fn default() -> Self {
        Config {
            providers: default_providers(),
            rate_limit: RateLimitConfig::default(),
            processing: ProcessingConfig::default(),
            log_level: LogLevel::default(),
        }
    }
}

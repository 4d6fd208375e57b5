/*!
 * Provider implementations for different language-model backends.
 *
 * This module contains client implementations for each backend family:
 * - OpenAI: any OpenAI-compatible chat completions API (SiliconFlow,
 *   Alibaba DashScope, OpenAI, LM Studio, ...)
 * - Anthropic: Anthropic messages API
 * - Ollama: Local LLM server
 *
 * Every client is exposed through the object-safe `Provider` trait so the
 * dispatcher can hold an ordered list of heterogeneous backends.
 */

use async_trait::async_trait;
use log::{debug, info, warn};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt::Debug;
use url::Url;

use crate::app_config::{Config, ProviderConfig, ProviderKind};
use crate::errors::ProviderError;

/// Common trait for all LLM providers
///
/// A provider performs exactly one attempt per call; retrying and falling
/// back to other providers is the dispatcher's job.
#[async_trait]
pub trait Provider: Send + Sync + Debug {
    /// Provider identity, as named in the configuration
    fn name(&self) -> &str;

    /// Model identifier sent with each request
    fn model(&self) -> &str;

    /// Transform a prompt into text
    ///
    /// # Arguments
    /// * `prompt` - Fully rendered prompt
    /// * `temperature` - Sampling temperature
    /// * `max_tokens` - Completion token budget
    ///
    /// # Returns
    /// * `Result<String, ProviderError>` - The completion text or an error
    async fn execute(&self, prompt: &str, temperature: f32, max_tokens: u32) -> Result<String, ProviderError>;

    /// Release any held connection resources
    fn close(&self) {}
}

/// Merge backend-specific parameters into a serialized request body.
///
/// Extra parameters win over the generated fields, mirroring how they are
/// meant to override defaults for a particular backend.
pub fn merge_extra_params(body: &mut Value, extra: &BTreeMap<String, Value>) {
    if extra.is_empty() {
        return;
    }
    if let Value::Object(map) = body {
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
    } else {
        let mut map = Map::new();
        for (key, value) in extra {
            map.insert(key.clone(), value.clone());
        }
        *body = Value::Object(map);
    }
}

/// Check that a configured base URL is an absolute http(s) URL
pub fn validate_base_url(name: &str, base_url: &str) -> Result<String, ProviderError> {
    let url = Url::parse(base_url)
        .map_err(|e| ProviderError::InvalidEndpoint(format!("{} base_url '{}': {}", name, base_url, e)))?;
    if url.scheme() != "http" && url.scheme() != "https" {
        return Err(ProviderError::InvalidEndpoint(format!(
            "{} base_url '{}' must use http or https",
            name, base_url
        )));
    }
    Ok(base_url.trim_end_matches('/').to_string())
}

/// Resolve the API key for a provider from the process environment
fn resolve_api_key(config: &ProviderConfig, kind: &ProviderKind) -> Result<String, ProviderError> {
    let env_var = config.api_key_env_var();
    match std::env::var(&env_var) {
        Ok(key) if !key.trim().is_empty() => Ok(key.trim().to_string()),
        _ if kind.requires_api_key() => Err(ProviderError::MissingApiKey {
            name: config.name.clone(),
            env_var,
        }),
        _ => Ok(String::new()),
    }
}

/// Build a ready-to-use provider from its definition
pub fn create_provider(config: &ProviderConfig) -> Result<Box<dyn Provider>, ProviderError> {
    let kind = config.kind().ok_or_else(|| ProviderError::Unsupported {
        name: config.name.clone(),
        provider_type: config.type_label(),
    })?;
    let api_key = resolve_api_key(config, &kind)?;

    let provider: Box<dyn Provider> = match kind {
        ProviderKind::OpenAI => Box::new(openai::OpenAI::from_config(config, api_key)?),
        ProviderKind::Anthropic => Box::new(anthropic::Anthropic::from_config(config, api_key)?),
        ProviderKind::Ollama => Box::new(ollama::Ollama::from_config(config)?),
    };

    debug!("Created {} provider '{}' ({})", kind.display_name(), provider.name(), provider.model());
    Ok(provider)
}

/// Ordered set of providers owned for the duration of a run
///
/// Order is fallback priority. Connection pools are released by `close`,
/// or on drop if the set goes out of scope without being closed.
#[derive(Debug, Default)]
pub struct ProviderSet {
    providers: Vec<Box<dyn Provider>>,
    closed: bool,
}

impl ProviderSet {
    /// Wrap an already constructed list of providers
    pub fn new(providers: Vec<Box<dyn Provider>>) -> Self {
        Self {
            providers,
            closed: false,
        }
    }

    /// Construct every enabled provider, skipping those that cannot be built
    pub fn from_config(config: &Config) -> Self {
        let mut providers = Vec::new();
        for definition in config.enabled_providers() {
            match create_provider(definition) {
                Ok(provider) => providers.push(provider),
                Err(e) => warn!("Skipping provider '{}': {}", definition.name, e),
            }
        }
        Self::new(providers)
    }

    pub fn as_slice(&self) -> &[Box<dyn Provider>] {
        &self.providers
    }

    pub fn len(&self) -> usize {
        self.providers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.providers.is_empty()
    }

    /// Provider names in priority order
    pub fn names(&self) -> Vec<&str> {
        self.providers.iter().map(|p| p.name()).collect()
    }

    /// Release every provider's resources
    pub fn close(mut self) {
        self.release();
    }

    fn release(&mut self) {
        if self.closed {
            return;
        }
        for provider in self.providers.drain(..) {
            provider.close();
            debug!("Released provider '{}'", provider.name());
        }
        self.closed = true;
        info!("All provider connections released");
    }
}

impl Drop for ProviderSet {
    fn drop(&mut self) {
        self.release();
    }
}

pub mod anthropic;
pub mod mock;
pub mod ollama;
pub mod openai;

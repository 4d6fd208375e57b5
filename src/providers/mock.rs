/*!
 * Mock provider implementations for testing.
 *
 * This module provides mock providers that simulate different behaviors:
 * - `MockProvider::working()` - Always succeeds, echoing the prompt
 * - `MockProvider::fail_times()` - Fails a fixed number of times, then succeeds
 * - `MockProvider::failing()` - Always fails with an error
 *
 * Every mock counts its calls (shared between clones) so tests can assert
 * exact attempt counts, and can append its name to a shared call log to
 * check the order in which providers were contacted.
 */

use async_trait::async_trait;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use crate::errors::ProviderError;
use crate::providers::Provider;

/// Behavior mode for the mock provider
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MockBehavior {
    /// Always succeeds
    Working,
    /// Fails the first `failures` calls, then succeeds
    FailTimes { failures: usize },
    /// Always fails with an error
    Failing,
    /// Answers with nothing, which counts as a failure
    Empty,
    /// Simulates slow response (for timeout testing)
    Slow { delay_ms: u64 },
}

/// Shared, ordered record of which provider was called
pub type CallLog = Arc<Mutex<Vec<String>>>;

/// Mock provider for testing dispatch behavior
#[derive(Debug)]
pub struct MockProvider {
    name: String,
    model: String,
    /// Behavior mode
    behavior: MockBehavior,
    /// Request counter, shared by clones
    request_count: Arc<AtomicUsize>,
    close_count: Arc<AtomicUsize>,
    prompts: Arc<Mutex<Vec<String>>>,
    call_log: Option<CallLog>,
    /// Custom response generator (optional)
    custom_response: Option<fn(&str) -> Result<String, ProviderError>>,
}

impl MockProvider {
    /// Create a new mock provider with the specified behavior
    pub fn new(name: impl Into<String>, behavior: MockBehavior) -> Self {
        Self {
            name: name.into(),
            model: "mock-model".to_string(),
            behavior,
            request_count: Arc::new(AtomicUsize::new(0)),
            close_count: Arc::new(AtomicUsize::new(0)),
            prompts: Arc::new(Mutex::new(Vec::new())),
            call_log: None,
            custom_response: None,
        }
    }

    /// Create a working mock provider that always succeeds
    pub fn working(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Working)
    }

    /// Create a failing mock provider that always errors
    pub fn failing(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Failing)
    }

    /// Create a mock that fails `failures` times before succeeding
    pub fn fail_times(name: impl Into<String>, failures: usize) -> Self {
        Self::new(name, MockBehavior::FailTimes { failures })
    }

    /// Create a mock that returns empty responses
    pub fn empty(name: impl Into<String>) -> Self {
        Self::new(name, MockBehavior::Empty)
    }

    /// Set a custom response generator, used by the working behaviors
    pub fn with_custom_response(mut self, generator: fn(&str) -> Result<String, ProviderError>) -> Self {
        self.custom_response = Some(generator);
        self
    }

    /// Record every call's provider name into a shared log
    pub fn with_call_log(mut self, log: CallLog) -> Self {
        self.call_log = Some(log);
        self
    }

    /// Number of `execute` calls so far
    pub fn call_count(&self) -> usize {
        self.request_count.load(Ordering::SeqCst)
    }

    /// Handle on the call counter that outlives moving the mock into a set
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.request_count)
    }

    /// Handle on the close counter
    pub fn close_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.close_count)
    }

    /// Handle on the received prompts
    pub fn prompt_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.prompts)
    }

    fn respond(&self, prompt: &str) -> Result<String, ProviderError> {
        match self.custom_response {
            Some(generator) => generator(prompt),
            None => Ok(format!("[{}] {}", self.name, prompt)),
        }
    }

    fn simulated_failure(&self, count: usize) -> ProviderError {
        ProviderError::ApiError {
            message: format!("Simulated failure of {} (request #{})", self.name, count + 1),
            status_code: 500,
        }
    }
}

impl Clone for MockProvider {
    fn clone(&self) -> Self {
        Self {
            name: self.name.clone(),
            model: self.model.clone(),
            behavior: self.behavior,
            request_count: Arc::clone(&self.request_count),
            close_count: Arc::clone(&self.close_count),
            prompts: Arc::clone(&self.prompts),
            call_log: self.call_log.clone(),
            custom_response: self.custom_response,
        }
    }
}

#[async_trait]
impl Provider for MockProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn execute(&self, prompt: &str, _temperature: f32, _max_tokens: u32) -> Result<String, ProviderError> {
        let count = self.request_count.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut prompts) = self.prompts.lock() {
            prompts.push(prompt.to_string());
        }
        if let Some(log) = &self.call_log {
            if let Ok(mut log) = log.lock() {
                log.push(self.name.clone());
            }
        }

        match self.behavior {
            MockBehavior::Working => self.respond(prompt),

            MockBehavior::FailTimes { failures } => {
                if count < failures {
                    Err(self.simulated_failure(count))
                } else {
                    self.respond(prompt)
                }
            }

            MockBehavior::Failing => Err(self.simulated_failure(count)),

            MockBehavior::Empty => Err(ProviderError::EmptyResponse(format!(
                "{} returned no content",
                self.name
            ))),

            MockBehavior::Slow { delay_ms } => {
                tokio::time::sleep(tokio::time::Duration::from_millis(delay_ms)).await;
                self.respond(prompt)
            }
        }
    }

    fn close(&self) {
        self.close_count.fetch_add(1, Ordering::SeqCst);
    }
}

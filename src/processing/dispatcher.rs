/*!
 * Ordered fallback with bounded retries.
 *
 * Providers are tried in list order. Each one gets up to
 * `RetryPolicy::max_attempts` attempts with `RetryPolicy::retry_delay`
 * between them; when it runs out, the next provider starts from attempt
 * one. The first success ends the dispatch. Only running out of providers
 * is an error.
 *
 * The loop is written as an explicit state machine so the attempt
 * bookkeeping is visible in one place:
 *
 * ```text
 * Trying(p, a) --ok--------------------------> Succeeded
 * Trying(p, a) --err, a < max----------------> Trying(p, a + 1)   (retry pause)
 * Trying(p, a) --err, a == max, p + 1 < n----> Trying(p + 1, 1)
 * Trying(p, a) --err, a == max, p + 1 == n---> Exhausted
 * ```
 */

use log::{error, info, warn};
use std::sync::Arc;

use crate::errors::{DispatchError, ProviderError, ProviderFailure};
use crate::providers::Provider;
use super::policy::{Pacer, PauseReason, RetryPolicy, TokioPacer};

/// Sampling parameters passed through to every provider call
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GenerationParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

impl Default for GenerationParams {
    fn default() -> Self {
        Self {
            temperature: 0.7,
            max_tokens: 4000,
        }
    }
}

/// A prompt that some provider answered
#[derive(Debug, Clone, PartialEq)]
pub struct DispatchSuccess {
    /// Completion text
    pub text: String,
    /// Name of the provider that produced it
    pub provider: String,
    /// Attempts spent across all providers, including the successful one
    pub attempts: u32,
}

/// Position of the dispatch loop
#[derive(Debug, Clone, PartialEq)]
pub enum DispatchState {
    /// About to make `attempt` (1-based) against provider index `provider`
    Trying { provider: usize, attempt: u32 },
    /// A provider answered
    Succeeded(DispatchSuccess),
    /// Every provider used up its attempts
    Exhausted,
}

/// Where to go after a failed attempt
pub fn next_after_failure(provider: usize, attempt: u32, provider_count: usize, policy: &RetryPolicy) -> DispatchState {
    if attempt < policy.max_attempts() {
        DispatchState::Trying { provider, attempt: attempt + 1 }
    } else if provider + 1 < provider_count {
        DispatchState::Trying { provider: provider + 1, attempt: 1 }
    } else {
        DispatchState::Exhausted
    }
}

/// Runs one prompt through the ordered provider list
#[derive(Clone)]
pub struct Dispatcher {
    policy: RetryPolicy,
    params: GenerationParams,
    pacer: Arc<dyn Pacer>,
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("policy", &self.policy)
            .field("params", &self.params)
            .finish()
    }
}

impl Dispatcher {
    /// Create a dispatcher that sleeps on the tokio timer
    pub fn new(policy: RetryPolicy, params: GenerationParams) -> Self {
        Self::with_pacer(policy, params, Arc::new(TokioPacer))
    }

    /// Create a dispatcher with a custom pacer
    pub fn with_pacer(policy: RetryPolicy, params: GenerationParams, pacer: Arc<dyn Pacer>) -> Self {
        Self { policy, params, pacer }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    pub fn params(&self) -> &GenerationParams {
        &self.params
    }

    /// The pacer shared with callers that need to space out dispatches
    pub fn pacer(&self) -> Arc<dyn Pacer> {
        Arc::clone(&self.pacer)
    }

    /// Send `prompt` to the providers in order until one succeeds
    pub async fn dispatch(&self, providers: &[Box<dyn Provider>], prompt: &str) -> Result<DispatchSuccess, DispatchError> {
        if providers.is_empty() {
            error!("No providers available to dispatch to");
            return Err(DispatchError::NoProviders);
        }

        let max_attempts = self.policy.max_attempts();
        let mut failures: Vec<ProviderFailure> = Vec::new();
        let mut total_attempts = 0u32;
        let mut state = DispatchState::Trying { provider: 0, attempt: 1 };

        loop {
            state = match state {
                DispatchState::Trying { provider, attempt } => {
                    let handle = &providers[provider];

                    if attempt > 1 {
                        self.pacer.pause(self.policy.retry_delay(), PauseReason::Retry).await;
                    }

                    info!(
                        "Trying {} ({}) attempt {}/{}",
                        handle.name(),
                        handle.model(),
                        attempt,
                        max_attempts
                    );
                    total_attempts += 1;

                    match handle.execute(prompt, self.params.temperature, self.params.max_tokens).await {
                        Ok(text) => DispatchState::Succeeded(DispatchSuccess {
                            text,
                            provider: handle.name().to_string(),
                            attempts: total_attempts,
                        }),
                        Err(e) => {
                            warn!("Error with {}: {}", handle.name(), e);
                            let next = next_after_failure(provider, attempt, providers.len(), &self.policy);
                            if !matches!(next, DispatchState::Trying { provider: p, .. } if p == provider) {
                                failures.push(Self::failure(handle.as_ref(), attempt, e));
                            }
                            next
                        }
                    }
                }
                DispatchState::Succeeded(success) => {
                    if success.provider != providers[0].name() {
                        info!("Fell back to {} after {} attempt(s)", success.provider, success.attempts);
                    }
                    return Ok(success);
                }
                DispatchState::Exhausted => {
                    error!("All {} provider(s) exhausted their {} attempt(s)", providers.len(), max_attempts);
                    return Err(DispatchError::AllProvidersExhausted { failures });
                }
            };
        }
    }

    fn failure(provider: &dyn Provider, attempts: u32, last_error: ProviderError) -> ProviderFailure {
        ProviderFailure {
            provider: provider.name().to_string(),
            model: provider.model().to_string(),
            attempts,
            last_error,
        }
    }
}

/*!
 * Error types for the subclean application.
 *
 * This module contains custom error types for the different layers of the
 * dispatch engine, using the thiserror crate for ergonomic error definitions:
 * - `ProviderError`: a single attempt against one backend failed
 * - `DispatchError`: every provider exhausted its retries for one prompt
 * - `ProcessingError`: a whole document could not be processed
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),

    /// The backend answered but produced no usable text
    #[error("Empty response from provider: {0}")]
    EmptyResponse(String),

    /// The provider definition names a backend family we cannot talk to
    #[error("Unsupported provider type '{provider_type}' for provider '{name}'")]
    Unsupported {
        /// Provider name from the configuration
        name: String,
        /// The unknown type identifier
        provider_type: String,
    },

    /// The configured base URL cannot be used
    #[error("Invalid endpoint: {0}")]
    InvalidEndpoint(String),

    /// The provider needs an API key and its environment variable is unset
    #[error("Missing API key for provider '{name}': set the {env_var} environment variable")]
    MissingApiKey {
        /// Provider name from the configuration
        name: String,
        /// Environment variable that should hold the key
        env_var: String,
    },
}

impl ProviderError {
    /// Map a reqwest transport error onto the provider taxonomy
    pub fn from_transport(error: reqwest::Error) -> Self {
        if error.is_timeout() || error.is_connect() {
            Self::ConnectionError(error.to_string())
        } else if error.is_decode() {
            Self::ParseError(error.to_string())
        } else {
            Self::RequestFailed(error.to_string())
        }
    }

    /// Map a non-success HTTP status and its body onto the provider taxonomy
    pub fn from_status(status_code: u16, message: String) -> Self {
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }
}

/// Final state of one provider after the dispatcher gave up on it
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderFailure {
    /// Provider name
    pub provider: String,
    /// Model used by the provider
    pub model: String,
    /// Number of attempts made against this provider
    pub attempts: u32,
    /// Error returned by the last attempt
    pub last_error: ProviderError,
}

impl std::fmt::Display for ProviderFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} ({}) after {} attempt(s): {}",
            self.provider, self.model, self.attempts, self.last_error
        )
    }
}

/// Terminal failures of the fallback/retry dispatcher
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DispatchError {
    /// No provider was available to try
    #[error("No providers available")]
    NoProviders,

    /// Every provider exhausted its attempts
    #[error("All providers failed: {}", format_failures(.failures))]
    AllProvidersExhausted {
        /// One entry per provider, in the order they were tried
        failures: Vec<ProviderFailure>,
    },
}

impl DispatchError {
    /// Providers that were attempted before giving up
    pub fn attempted_providers(&self) -> Vec<&str> {
        match self {
            Self::NoProviders => Vec::new(),
            Self::AllProvidersExhausted { failures } => {
                failures.iter().map(|f| f.provider.as_str()).collect()
            }
        }
    }
}

fn format_failures(failures: &[ProviderFailure]) -> String {
    failures
        .iter()
        .map(|f| f.to_string())
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors that terminate processing of a single document
#[derive(Error, Debug)]
pub enum ProcessingError {
    /// The input had no text to send
    #[error("No text content found")]
    EmptyInput,

    /// The prompt template could not be rendered
    #[error("Invalid prompt template: {0}")]
    Template(String),

    /// The whole text was sent as one prompt and every provider failed
    #[error("Dispatch failed: {0}")]
    Dispatch(#[from] DispatchError),

    /// One chunk of a multi-chunk document failed; earlier chunk results are discarded
    #[error("Chunk {} of {total} failed: {source}", .index + 1)]
    ChunkFailed {
        /// Zero-based index of the failing chunk
        index: usize,
        /// Number of chunks in the document
        total: usize,
        /// Underlying dispatch failure
        source: DispatchError,
    },
}

/// Main application error type that wraps all other errors
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error from configuration loading or validation
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from processing a document
    #[error("Processing error: {0}")]
    Processing(#[from] ProcessingError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

// Utility functions for error conversion
impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

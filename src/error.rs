//! LLM error types.
//!
//! # Error Handling Philosophy
//!
//! Errors should be:
//! 1. **Actionable**: Tell the user what to do, not just what went wrong
//! 2. **Specific**: Include relevant context (model name, token counts, field path)
//! 3. **Early**: Pre-flight problems surface before any network call is made
//!
//! # Common Errors and Solutions
//!
//! | Error | Cause | Solution |
//! |-------|-------|----------|
//! | `UnknownModel` | Model missing from the capability table | Add it to `models.toml` |
//! | `UnsupportedModel` | No tokenizer family matches the model | Register a tokenizer prefix |
//! | `PromptTooLong` | Prompt fills the whole context window | Shorten the prompt |
//! | `MalformedResponse` | Provider response lacks the expected field | Check the provider API version |
//! | `AuthError` | Invalid/expired API key | Check `AI21_API_KEY` env var |
//!
//! The core never retries. Errors returned by a connector reach the caller
//! exactly as the connector produced them.

use thiserror::Error;

use crate::model_config::ModelConfigError;

/// Result type for LLM operations.
pub type Result<T> = std::result::Result<T, LlmError>;

/// Errors that can occur in LLM operations.
#[derive(Debug, Error)]
pub enum LlmError {
    /// Model identifier is not registered in the capability table.
    #[error("Unknown model: {0}")]
    UnknownModel(String),

    /// No tokenizer scheme is registered for the model's family.
    #[error("Unsupported model (no tokenizer for family): {0}")]
    UnsupportedModel(String),

    /// The prompt alone consumes the whole context window.
    #[error("Prompt too long: {prompt_tokens} tokens leaves no room in a {max_total_tokens}-token window")]
    PromptTooLong {
        prompt_tokens: usize,
        max_total_tokens: usize,
    },

    /// Provider response is missing the expected field path.
    #[error("Malformed response: missing string field at '{path}'")]
    MalformedResponse { path: String },

    /// Invalid request parameters.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// API error from the provider.
    #[error("API error: {0}")]
    ApiError(String),

    /// Rate limit exceeded.
    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    /// Authentication error.
    #[error("Authentication error: {0}")]
    AuthError(String),

    /// Network error.
    #[error("Network error: {0}")]
    NetworkError(String),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),

    /// Configuration error.
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// Timeout error.
    #[error("Request timed out")]
    Timeout,
}

impl From<reqwest::Error> for LlmError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            LlmError::Timeout
        } else if err.is_connect() {
            LlmError::NetworkError(format!("Connection failed: {}", err))
        } else {
            LlmError::NetworkError(err.to_string())
        }
    }
}

impl From<ModelConfigError> for LlmError {
    fn from(err: ModelConfigError) -> Self {
        LlmError::ConfigError(err.to_string())
    }
}

impl LlmError {
    /// Whether the error was raised before any request left the process.
    ///
    /// Pre-flight errors are deterministic: sending the same request again
    /// fails the same way until the prompt, model or configuration changes.
    pub fn is_preflight(&self) -> bool {
        matches!(
            self,
            Self::UnknownModel(_)
                | Self::UnsupportedModel(_)
                | Self::PromptTooLong { .. }
                | Self::InvalidRequest(_)
        )
    }

    /// Get a user-friendly description of the error with suggested action.
    ///
    /// # Example
    ///
    /// ```
    /// use llm_preflight::LlmError;
    ///
    /// let error = LlmError::PromptTooLong { prompt_tokens: 9000, max_total_tokens: 8192 };
    /// assert!(error.user_description().contains("9000/8192"));
    /// ```
    pub fn user_description(&self) -> String {
        match self {
            Self::UnknownModel(model) => format!(
                "Model '{}' has no known context window. Register it in models.toml.",
                model
            ),
            Self::UnsupportedModel(model) => format!(
                "No offline tokenizer is registered for '{}'. Add a tokenizer prefix for its family.",
                model
            ),
            Self::PromptTooLong {
                prompt_tokens,
                max_total_tokens,
            } => format!(
                "Prompt too large ({}/{} tokens). Shorten the prompt or pick a model with a larger context window.",
                prompt_tokens, max_total_tokens
            ),
            Self::MalformedResponse { path } => format!(
                "The provider response did not contain '{}'. The provider API may have changed.",
                path
            ),
            Self::InvalidRequest(msg) => {
                format!("Invalid request: {}. Check your parameters.", msg)
            }
            Self::NetworkError(_) => {
                "Unable to connect to the API. Check your internet connection.".to_string()
            }
            Self::Timeout => "Request timed out. The server may be overloaded.".to_string(),
            Self::RateLimited(_) => {
                "Rate limited by the API. Wait before sending more requests.".to_string()
            }
            Self::AuthError(_) => {
                "Authentication failed. Please check your API key is valid and not expired."
                    .to_string()
            }
            Self::ConfigError(msg) => format!("Configuration error: {}.", msg),
            Self::ApiError(msg) => format!("The provider rejected the request: {}", msg),
            Self::SerializationError(_) => {
                "Failed to encode or parse a provider payload.".to_string()
            }
        }
    }
}

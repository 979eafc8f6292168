//! AI21 Studio provider.
//!
//! Jurassic-2 completion and summarization over the AI21 Studio REST API.
//!
//! # Environment Variables
//!
//! - `AI21_API_KEY` (required)
//! - `AI21_MODEL` (optional, default: `j2-ultra`)
//! - `AI21_BASE_URL` (optional, default: `https://api.ai21.com/studio/v1`)
//!
//! # Endpoints
//!
//! | Call | Request |
//! |------|---------|
//! | `complete` | `POST {base_url}/{model}/complete` with `{prompt, ...params}` |
//! | `summarize` | `POST {base_url}/summarize` with `{source, sourceType, ...params}` |
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_preflight::{AI21Provider, LLMProvider, RequestParameters};
//!
//! let provider = AI21Provider::new("your-key", &RequestParameters::new())?;
//! let text = provider.complete("Write a haiku", &RequestParameters::new()).await?;
//! ```

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde_json::Value as JsonValue;
use tracing::debug;

use crate::budget::TokenBudgetValidator;
use crate::error::{LlmError, Result};
use crate::model_config::ProviderConfig;
use crate::params::RequestParameters;
use crate::provider::{ProviderFacade, ProviderProfile};
use crate::response::FieldPath;
use crate::traits::Connector;

/// Provider name used in logs and configuration.
pub const AI21_PROVIDER_NAME: &str = "ai21";

/// Default AI21 Studio API endpoint.
pub const AI21_BASE_URL: &str = "https://api.ai21.com/studio/v1";

/// Default completion model.
pub const AI21_DEFAULT_MODEL: &str = "j2-ultra";

/// Source type sent with every summarization request.
pub const AI21_SUMMARIZE_MODE: &str = "TEXT";

const AI21_API_KEY_ENV: &str = "AI21_API_KEY";
const AI21_MODEL_ENV: &str = "AI21_MODEL";
const AI21_BASE_URL_ENV: &str = "AI21_BASE_URL";
const DEFAULT_TIMEOUT_SECS: u64 = 120;

/// Request and response shape of AI21 Studio.
///
/// Defaults are `{temperature: 0.0, model: "j2-ultra"}`; completions are
/// bounded by `maxTokens`.
pub fn profile() -> ProviderProfile {
    ProviderProfile {
        name: AI21_PROVIDER_NAME.to_string(),
        budget_provider: AI21_PROVIDER_NAME.to_string(),
        builtin_defaults: RequestParameters::new()
            .with("temperature", 0.0)
            .with("model", AI21_DEFAULT_MODEL),
        model_param: "model".to_string(),
        max_tokens_param: "maxTokens".to_string(),
        completion_path: FieldPath::parse("completions.0.data.text"),
        summary_path: FieldPath::parse("summary"),
        summarize_mode: AI21_SUMMARIZE_MODE.to_string(),
    }
}

/// HTTP connector for AI21 Studio.
pub struct AI21Client {
    client: Client,
    api_key: String,
    base_url: String,
}

impl AI21Client {
    /// Create a client for the public endpoint.
    pub fn new(api_key: impl Into<String>) -> Result<Self> {
        Self::with_options(
            api_key,
            AI21_BASE_URL,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )
    }

    /// Create a client with an explicit endpoint and request timeout.
    pub fn with_options(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.is_empty() {
            return Err(LlmError::ConfigError(
                "AI21 API key is empty. Get your API key from https://studio.ai21.com".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| LlmError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;

        let base_url = base_url.into().trim_end_matches('/').to_string();

        debug!(
            provider = AI21_PROVIDER_NAME,
            base_url = %base_url,
            timeout_secs = timeout.as_secs(),
            "Created AI21 client"
        );

        Ok(Self {
            client,
            api_key,
            base_url,
        })
    }

    /// API endpoint in use.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn complete_url(&self, model: &str) -> String {
        format!("{}/{}/complete", self.base_url, model)
    }

    fn summarize_url(&self) -> String {
        format!("{}/summarize", self.base_url)
    }

    async fn post(&self, url: &str, body: JsonValue) -> Result<JsonValue> {
        let response = self
            .client
            .post(url)
            .bearer_auth(&self.api_key)
            .header("Accept", "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(match status.as_u16() {
                401 | 403 => LlmError::AuthError(text),
                429 => LlmError::RateLimited(text),
                _ => LlmError::ApiError(format!("HTTP {}: {}", status, text)),
            });
        }

        Ok(serde_json::from_str(&text)?)
    }
}

#[async_trait]
impl Connector for AI21Client {
    fn name(&self) -> &str {
        AI21_PROVIDER_NAME
    }

    async fn complete(&self, prompt: &str, params: &RequestParameters) -> Result<JsonValue> {
        let model = params.get_str("model").ok_or_else(|| {
            LlmError::InvalidRequest("AI21 completion requires a 'model' parameter".to_string())
        })?;

        // The model is part of the URL, not the body.
        let mut body = params.without("model").to_json_object()?;
        body.insert("prompt".to_string(), JsonValue::String(prompt.to_string()));

        self.post(&self.complete_url(model), JsonValue::Object(body))
            .await
    }

    async fn summarize(
        &self,
        text: &str,
        mode: &str,
        params: &RequestParameters,
    ) -> Result<JsonValue> {
        let mut body = params.to_json_object()?;
        body.insert("source".to_string(), JsonValue::String(text.to_string()));
        body.insert("sourceType".to_string(), JsonValue::String(mode.to_string()));

        self.post(&self.summarize_url(), JsonValue::Object(body))
            .await
    }
}

impl std::fmt::Debug for AI21Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AI21Client")
            .field("base_url", &self.base_url)
            .field("api_key", &"<redacted>")
            .finish()
    }
}

/// AI21 Studio behind the provider-neutral facade.
pub type AI21Provider = ProviderFacade<AI21Client>;

impl AI21Provider {
    /// Create a provider with `default_options` merged over the AI21 defaults.
    pub fn new(api_key: impl Into<String>, default_options: &RequestParameters) -> Result<Self> {
        Ok(ProviderFacade::with_connector(
            profile(),
            AI21Client::new(api_key)?,
            default_options,
        ))
    }

    /// Create a provider against a non-default endpoint.
    pub fn with_base_url(
        api_key: impl Into<String>,
        base_url: impl Into<String>,
        default_options: &RequestParameters,
    ) -> Result<Self> {
        let client = AI21Client::with_options(
            api_key,
            base_url,
            Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        )?;
        Ok(ProviderFacade::with_connector(
            profile(),
            client,
            default_options,
        ))
    }

    /// Create a provider from environment variables.
    ///
    /// Reads `AI21_API_KEY` (required), `AI21_MODEL` and `AI21_BASE_URL`.
    pub fn from_env() -> Result<Self> {
        Self::from_env_with_model(None)
    }

    /// Like [`from_env`](Self::from_env), with `model` taking precedence over `AI21_MODEL`.
    pub fn from_env_with_model(model: Option<&str>) -> Result<Self> {
        let api_key = std::env::var(AI21_API_KEY_ENV).map_err(|_| {
            LlmError::ConfigError(
                "AI21_API_KEY environment variable not set. \
                 Get your API key from https://studio.ai21.com"
                    .to_string(),
            )
        })?;

        let model = model
            .map(str::to_string)
            .or_else(|| std::env::var(AI21_MODEL_ENV).ok())
            .filter(|m| !m.is_empty());

        let mut options = RequestParameters::new();
        if let Some(model) = model {
            options.insert("model", model);
        }

        let base_url = std::env::var(AI21_BASE_URL_ENV)
            .ok()
            .filter(|url| !url.is_empty())
            .unwrap_or_else(|| AI21_BASE_URL.to_string());

        Self::with_base_url(api_key, base_url, &options)
    }

    /// Create a provider from a [`ProviderConfig`] entry.
    ///
    /// Budgets use that entry's models and tokenizer families.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let env_var = config.api_key_env.as_deref().unwrap_or(AI21_API_KEY_ENV);
        let api_key = std::env::var(env_var).map_err(|_| {
            LlmError::ConfigError(format!(
                "API key environment variable '{}' not set for provider '{}'.",
                env_var, config.name
            ))
        })?;

        let base_url = config
            .resolved_base_url()
            .unwrap_or_else(|| AI21_BASE_URL.to_string());
        let client = AI21Client::with_options(
            api_key,
            base_url,
            Duration::from_secs(config.timeout_seconds),
        )?;

        let mut options = RequestParameters::new();
        if let Some(model) = &config.default_model {
            options.insert("model", model.as_str());
        }

        let validator = TokenBudgetValidator::from_provider_config(config)?;
        Ok(ProviderFacade::with_connector(
            ProviderProfile {
                name: config.name.clone(),
                budget_provider: config.name.clone(),
                ..profile()
            },
            client,
            &options,
        )
        .with_validator(validator))
    }
}

//! Provider-neutral facade.
//!
//! Every provider runs the same pipeline; only the connector and a small
//! [`ProviderProfile`] differ between vendors:
//!
//! ```text
//! complete(prompt, overrides)
//!   ├── merge(defaults, overrides)
//!   ├── model = merged["model"]
//!   ├── ceiling = validator.compute_max_completion_tokens(prompt, model)
//!   ├── merged[max_tokens_param] = ceiling   (only when absent)
//!   ├── connector.complete(prompt, merged)
//!   └── project completion_path → String
//!
//! summarize(text, overrides)
//!   ├── connector.summarize(text, summarize_mode, overrides)
//!   └── project summary_path → String
//! ```

use async_trait::async_trait;
use tracing::{debug, warn};

use crate::budget::{TokenBudget, TokenBudgetValidator};
use crate::error::{LlmError, Result};
use crate::params::{merge, ParamValue, RequestParameters};
use crate::response::FieldPath;
use crate::traits::{Connector, LLMProvider};

/// Vendor-specific shape of requests and responses.
#[derive(Debug, Clone)]
pub struct ProviderProfile {
    /// Provider name, used in logs.
    pub name: String,
    /// `models.toml` provider whose models and tokenizers budget requests.
    pub budget_provider: String,
    /// Defaults applied under the caller's `default_options`.
    pub builtin_defaults: RequestParameters,
    /// Parameter that selects the model.
    pub model_param: String,
    /// Parameter that bounds completion length.
    pub max_tokens_param: String,
    /// Where the completion text lives in a completion response.
    pub completion_path: FieldPath,
    /// Where the summary lives in a summarization response.
    pub summary_path: FieldPath,
    /// Source type sent with summarization requests.
    pub summarize_mode: String,
}

/// [`LLMProvider`] built from a [`ProviderProfile`] and a [`Connector`].
pub struct ProviderFacade<C> {
    profile: ProviderProfile,
    connector: C,
    defaults: RequestParameters,
    validator: TokenBudgetValidator,
}

impl<C: Connector> ProviderFacade<C> {
    /// Create a facade whose defaults are `default_options` merged over the
    /// profile's built-in defaults. Budgets use the tables of the profile's
    /// `budget_provider`, so models of other vendors fail `UnknownModel`.
    pub fn with_connector(
        profile: ProviderProfile,
        connector: C,
        default_options: &RequestParameters,
    ) -> Self {
        let defaults = merge(&profile.builtin_defaults, default_options);

        debug!(
            provider = %profile.name,
            connector = connector.name(),
            model = defaults.get_str(&profile.model_param).unwrap_or("<unset>"),
            "Created provider"
        );

        let validator = TokenBudgetValidator::for_provider(profile.budget_provider.as_str());
        Self {
            profile,
            connector,
            defaults,
            validator,
        }
    }

    /// Use a specific validator instead of the provider's configured tables.
    pub fn with_validator(mut self, validator: TokenBudgetValidator) -> Self {
        self.validator = validator;
        self
    }

    /// The provider's profile.
    pub fn profile(&self) -> &ProviderProfile {
        &self.profile
    }

    /// The underlying connector.
    pub fn connector(&self) -> &C {
        &self.connector
    }

    /// Run the pre-flight check for `prompt` without sending anything.
    ///
    /// `overrides` are merged over the defaults exactly as [`LLMProvider::complete`]
    /// would, so an overridden model is budgeted against its own window.
    pub fn token_budget(&self, prompt: &str, overrides: &RequestParameters) -> Result<TokenBudget> {
        let merged = merge(&self.defaults, overrides);
        let model = self.model_of(&merged)?;
        self.validator.budget(prompt, model)
    }

    fn model_of<'a>(&self, params: &'a RequestParameters) -> Result<&'a str> {
        match params.get(&self.profile.model_param) {
            Some(ParamValue::String(model)) => Ok(model),
            Some(other) => Err(LlmError::InvalidRequest(format!(
                "'{}' must be a string, got {:?}",
                self.profile.model_param, other
            ))),
            None => Err(LlmError::InvalidRequest(format!(
                "no '{}' parameter set for provider {}",
                self.profile.model_param, self.profile.name
            ))),
        }
    }

    /// Insert the ceiling under the completion-bound key unless the caller set one.
    fn apply_ceiling(&self, params: &mut RequestParameters, model: &str, budget: &TokenBudget) {
        let key = &self.profile.max_tokens_param;
        match params.get(key).map(ParamValue::as_i64) {
            None => {
                params.insert(key.as_str(), budget.max_completion_tokens);
            }
            Some(Some(explicit))
                if explicit > 0 && explicit as u64 > budget.max_completion_tokens as u64 =>
            {
                warn!(
                    provider = %self.profile.name,
                    model = %model,
                    requested = explicit,
                    max_completion_tokens = budget.max_completion_tokens,
                    "Explicit completion limit exceeds the remaining context window"
                );
            }
            Some(_) => {}
        }
    }
}

#[async_trait]
impl<C: Connector> LLMProvider for ProviderFacade<C> {
    fn name(&self) -> &str {
        &self.profile.name
    }

    fn defaults(&self) -> &RequestParameters {
        &self.defaults
    }

    fn model(&self) -> Option<&str> {
        self.defaults.get_str(&self.profile.model_param)
    }

    async fn complete(&self, prompt: &str, params: &RequestParameters) -> Result<String> {
        let mut merged = merge(&self.defaults, params);
        let model = self.model_of(&merged)?.to_string();
        let budget = self.validator.budget(prompt, &model)?;
        self.apply_ceiling(&mut merged, &model, &budget);

        debug!(
            provider = %self.profile.name,
            model = %model,
            prompt_tokens = budget.prompt_tokens,
            max_total_tokens = budget.max_total_tokens,
            max_completion_tokens = budget.max_completion_tokens,
            "Sending completion request"
        );

        let response = self.connector.complete(prompt, &merged).await?;
        self.profile.completion_path.extract_text(&response)
    }

    async fn summarize(&self, text: &str, params: &RequestParameters) -> Result<String> {
        debug!(
            provider = %self.profile.name,
            chars = text.chars().count(),
            "Sending summarize request"
        );
        let response = self
            .connector
            .summarize(text, &self.profile.summarize_mode, params)
            .await?;
        self.profile.summary_path.extract_text(&response)
    }
}

impl<C: std::fmt::Debug> std::fmt::Debug for ProviderFacade<C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderFacade")
            .field("provider", &self.profile.name)
            .field("defaults", &self.defaults)
            .field("connector", &self.connector)
            .finish()
    }
}

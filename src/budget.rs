//! Token budget pre-flight validation.
//!
//! Before a completion request leaves the process, the validator works out
//! how many completion tokens still fit in the model's context window:
//!
//! ```text
//! ┌──────────────────── max_total_tokens ────────────────────┐
//! │ prompt_tokens            │ max_completion_tokens          │
//! └──────────────────────────┴────────────────────────────────┘
//! ```
//!
//! A prompt that fills the window is rejected with
//! [`LlmError::PromptTooLong`] rather than clamped: a zero completion budget
//! is never a valid request.

use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

use tracing::debug;

use crate::capability::ModelCapabilityTable;
use crate::error::{LlmError, Result};
use crate::model_config::{ModelsConfig, ProviderConfig};
use crate::tokenizer::TokenizerRegistry;

/// Token accounting for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBudget {
    /// Tokens consumed by the prompt.
    pub prompt_tokens: usize,
    /// Model context window.
    pub max_total_tokens: usize,
    /// Tokens left for the completion; always positive.
    pub max_completion_tokens: usize,
}

enum Tables {
    Global,
    Provider(String),
    Owned {
        capabilities: Arc<ModelCapabilityTable>,
        tokenizers: Arc<TokenizerRegistry>,
    },
}

type ProviderTables =
    HashMap<String, std::result::Result<(ModelCapabilityTable, TokenizerRegistry), String>>;

static PROVIDER_TABLES: OnceLock<ProviderTables> = OnceLock::new();

/// Tables of one enabled provider in [`ModelsConfig::global`], built once per process.
fn provider_tables(
    name: &str,
) -> Result<(&'static ModelCapabilityTable, &'static TokenizerRegistry)> {
    let tables = PROVIDER_TABLES.get_or_init(|| {
        ModelsConfig::global()
            .providers
            .iter()
            .filter(|p| p.enabled)
            .map(|p| {
                let built = TokenizerRegistry::for_provider(p)
                    .map(|registry| (ModelCapabilityTable::for_provider(p), registry))
                    .map_err(|e| e.to_string());
                (p.name.clone(), built)
            })
            .collect()
    });

    match tables.get(name) {
        Some(Ok((capabilities, tokenizers))) => Ok((capabilities, tokenizers)),
        Some(Err(e)) => Err(LlmError::ConfigError(e.clone())),
        None => Err(LlmError::ConfigError(format!(
            "Provider '{}' is not an enabled provider in the model configuration",
            name
        ))),
    }
}

/// Computes completion-token ceilings from a capability table and tokenizer registry.
pub struct TokenBudgetValidator {
    tables: Tables,
}

impl TokenBudgetValidator {
    /// Validator over the process-wide tables of every provider.
    pub fn global() -> Self {
        Self {
            tables: Tables::Global,
        }
    }

    /// Validator over one provider's models and tokenizer families in
    /// [`ModelsConfig::global`]. Models of other providers are unknown to it.
    pub fn for_provider(name: impl Into<String>) -> Self {
        Self {
            tables: Tables::Provider(name.into()),
        }
    }

    /// Validator over the models and tokenizer families of `provider`.
    pub fn from_provider_config(provider: &ProviderConfig) -> Result<Self> {
        Ok(Self::new(
            ModelCapabilityTable::for_provider(provider),
            TokenizerRegistry::for_provider(provider)?,
        ))
    }

    /// Validator over explicit tables.
    pub fn new(capabilities: ModelCapabilityTable, tokenizers: TokenizerRegistry) -> Self {
        Self::shared(Arc::new(capabilities), Arc::new(tokenizers))
    }

    /// Validator over shared tables.
    pub fn shared(
        capabilities: Arc<ModelCapabilityTable>,
        tokenizers: Arc<TokenizerRegistry>,
    ) -> Self {
        Self {
            tables: Tables::Owned {
                capabilities,
                tokenizers,
            },
        }
    }

    fn tables(&self) -> Result<(&ModelCapabilityTable, &TokenizerRegistry)> {
        match &self.tables {
            Tables::Global => Ok((ModelCapabilityTable::global(), TokenizerRegistry::global()?)),
            Tables::Provider(name) => provider_tables(name),
            Tables::Owned {
                capabilities,
                tokenizers,
            } => Ok((capabilities.as_ref(), tokenizers.as_ref())),
        }
    }

    /// Full token accounting for `prompt` against `model`.
    ///
    /// # Errors
    ///
    /// - [`LlmError::UnknownModel`] if the model has no registered window
    /// - [`LlmError::UnsupportedModel`] if no tokenizer covers the model's family
    /// - [`LlmError::PromptTooLong`] if the prompt leaves no completion tokens
    pub fn budget(&self, prompt: &str, model: &str) -> Result<TokenBudget> {
        let (capabilities, tokenizers) = self.tables()?;
        let max_total_tokens = capabilities.max_total_tokens(model)?;
        let prompt_tokens = tokenizers.count_tokens(prompt, model)?;

        if prompt_tokens >= max_total_tokens {
            return Err(LlmError::PromptTooLong {
                prompt_tokens,
                max_total_tokens,
            });
        }

        let budget = TokenBudget {
            prompt_tokens,
            max_total_tokens,
            max_completion_tokens: max_total_tokens - prompt_tokens,
        };
        debug!(
            model = %model,
            prompt_tokens = budget.prompt_tokens,
            max_total_tokens = budget.max_total_tokens,
            max_completion_tokens = budget.max_completion_tokens,
            "Computed token budget"
        );
        Ok(budget)
    }

    /// Maximum completion tokens that may be requested for `prompt` on `model`.
    pub fn compute_max_completion_tokens(&self, prompt: &str, model: &str) -> Result<usize> {
        self.budget(prompt, model).map(|b| b.max_completion_tokens)
    }
}

impl Default for TokenBudgetValidator {
    fn default() -> Self {
        Self::global()
    }
}

impl std::fmt::Debug for TokenBudgetValidator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.tables {
            Tables::Global => f.write_str("TokenBudgetValidator(global)"),
            Tables::Provider(name) => write!(f, "TokenBudgetValidator(provider {})", name),
            Tables::Owned {
                capabilities,
                tokenizers,
            } => f
                .debug_struct("TokenBudgetValidator")
                .field("models", &capabilities.len())
                .field("tokenizers", &tokenizers.len())
                .finish(),
        }
    }
}

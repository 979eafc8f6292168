//! Model capability table.
//!
//! Maps an exact model identifier to its context window (prompt and
//! completion tokens combined). The table has no mutating API: it is built
//! once, from configuration or from explicit entries, and only read after.

use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::{LlmError, Result};
use crate::model_config::{ModelsConfig, ProviderConfig};

/// Context window of one model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModelCapability {
    /// Model identifier.
    pub model: String,
    /// Maximum tokens per request, prompt plus completion.
    pub max_total_tokens: usize,
}

impl ModelCapability {
    /// Create a capability entry.
    pub fn new(model: impl Into<String>, max_total_tokens: usize) -> Self {
        Self {
            model: model.into(),
            max_total_tokens,
        }
    }
}

/// Read-only lookup from model identifier to [`ModelCapability`].
#[derive(Debug, Clone, Default)]
pub struct ModelCapabilityTable {
    entries: HashMap<String, ModelCapability>,
}

static GLOBAL_TABLE: OnceLock<ModelCapabilityTable> = OnceLock::new();

impl ModelCapabilityTable {
    /// Build a table from every enabled provider's models.
    pub fn from_config(config: &ModelsConfig) -> Self {
        config
            .all_models()
            .into_iter()
            .map(|(_, card)| ModelCapability::new(card.name.clone(), card.context_length))
            .collect()
    }

    /// Build a table from one provider's models only.
    pub fn for_provider(provider: &ProviderConfig) -> Self {
        provider
            .models
            .iter()
            .map(|card| ModelCapability::new(card.name.clone(), card.context_length))
            .collect()
    }

    /// Process-wide table derived from [`ModelsConfig::global`].
    pub fn global() -> &'static Self {
        GLOBAL_TABLE.get_or_init(|| Self::from_config(ModelsConfig::global()))
    }

    /// Look up a model's capability.
    pub fn get(&self, model: &str) -> Option<&ModelCapability> {
        self.entries.get(model)
    }

    /// Context window for `model`, or [`LlmError::UnknownModel`].
    pub fn max_total_tokens(&self, model: &str) -> Result<usize> {
        self.get(model)
            .map(|c| c.max_total_tokens)
            .ok_or_else(|| LlmError::UnknownModel(model.to_string()))
    }

    /// Whether `model` is registered.
    pub fn contains(&self, model: &str) -> bool {
        self.entries.contains_key(model)
    }

    /// Registered model identifiers, sorted.
    pub fn models(&self) -> Vec<&str> {
        let mut models: Vec<&str> = self.entries.keys().map(String::as_str).collect();
        models.sort_unstable();
        models
    }

    /// Number of registered models.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the table is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ModelCapability> for ModelCapabilityTable {
    /// Later entries for the same model replace earlier ones.
    fn from_iter<I: IntoIterator<Item = ModelCapability>>(iter: I) -> Self {
        Self {
            entries: iter
                .into_iter()
                .map(|c| (c.model.clone(), c))
                .collect(),
        }
    }
}

impl<S: Into<String>> FromIterator<(S, usize)> for ModelCapabilityTable {
    fn from_iter<I: IntoIterator<Item = (S, usize)>>(iter: I) -> Self {
        iter.into_iter()
            .map(|(model, window)| ModelCapability::new(model, window))
            .collect()
    }
}

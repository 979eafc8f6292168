//! Model Configuration Module
//!
//! TOML-based configuration for the models a provider facade may target:
//! each model's context window and the tokenizer families used to count
//! prompt tokens offline.
//!
//! # Configuration File Location
//!
//! The config file is loaded from (in order of priority):
//! 1. `LLM_PREFLIGHT_MODELS_CONFIG` environment variable
//! 2. `./models.toml` (current working directory)
//! 3. `~/.llm-preflight/models.toml` (user config)
//! 4. Built-in default configuration
//!
//! # Example Configuration
//!
//! ```toml
//! [defaults]
//! provider = "ai21"
//! model = "j2-ultra"
//!
//! [[providers]]
//! name = "ai21"
//! display_name = "AI21 Studio"
//! type = "ai21"
//! api_key_env = "AI21_API_KEY"
//! base_url = "https://api.ai21.com/studio/v1"
//!
//! [[providers.tokenizers]]
//! prefix = "j2-"
//! kind = "char_ratio"
//! chars_per_token = 4.0
//!
//! [[providers.models]]
//! name = "j2-ultra"
//! display_name = "Jurassic-2 Ultra"
//! context_length = 8192
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::{debug, warn};

use crate::providers::ai21::AI21_DEFAULT_MODEL;
use crate::tokenizer::{TokenizerFamily, TokenizerKind};

/// Environment variable naming an explicit config file.
pub const MODELS_CONFIG_ENV: &str = "LLM_PREFLIGHT_MODELS_CONFIG";

// ============================================================================
// Error Types
// ============================================================================

/// Errors that can occur during model configuration loading.
#[derive(Error, Debug)]
pub enum ModelConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file: {0}")]
    IoError(#[from] std::io::Error),

    /// Failed to parse TOML configuration.
    #[error("Failed to parse TOML config: {0}")]
    ParseError(String),

    /// Invalid configuration (missing required fields, invalid values).
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// Provider not found in configuration.
    #[error("Provider not found: {0}")]
    ProviderNotFound(String),
}

// ============================================================================
// Provider Type
// ============================================================================

/// Provider type for API compatibility.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderType {
    /// AI21 Studio (Jurassic-2).
    #[default]
    AI21,
    /// OpenAI.
    OpenAI,
    /// Anthropic Claude.
    Anthropic,
    /// Mock provider for testing.
    Mock,
}

impl ProviderType {
    /// Model a connector of this type selects when no `default_model` is set.
    pub fn builtin_default_model(&self) -> Option<&'static str> {
        match self {
            ProviderType::AI21 => Some(AI21_DEFAULT_MODEL),
            ProviderType::OpenAI | ProviderType::Anthropic | ProviderType::Mock => None,
        }
    }
}

impl std::fmt::Display for ProviderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderType::AI21 => write!(f, "ai21"),
            ProviderType::OpenAI => write!(f, "openai"),
            ProviderType::Anthropic => write!(f, "anthropic"),
            ProviderType::Mock => write!(f, "mock"),
        }
    }
}

// ============================================================================
// Model Card
// ============================================================================

/// Model entry with its context window.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelCard {
    /// Unique model identifier (e.g., "j2-ultra").
    pub name: String,

    /// Human-readable display name.
    #[serde(default)]
    pub display_name: String,

    /// Maximum context length (prompt + completion tokens).
    pub context_length: usize,
}

impl ModelCard {
    /// Create a model card with the given context window.
    pub fn new(name: impl Into<String>, context_length: usize) -> Self {
        let name = name.into();
        Self {
            display_name: name.clone(),
            name,
            context_length,
        }
    }

    fn displayed_as(mut self, display_name: &str) -> Self {
        self.display_name = display_name.to_string();
        self
    }
}

// ============================================================================
// Provider Configuration
// ============================================================================

/// Configuration for a provider (AI21, OpenAI, ...).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Unique provider identifier (e.g., "ai21").
    pub name: String,

    /// Human-readable display name.
    #[serde(default)]
    pub display_name: String,

    /// Provider type for API compatibility.
    #[serde(rename = "type")]
    pub provider_type: ProviderType,

    /// Environment variable name for API key (if required).
    #[serde(default)]
    pub api_key_env: Option<String>,

    /// Base URL for the provider API.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Environment variable for base URL override.
    #[serde(default)]
    pub base_url_env: Option<String>,

    /// Default model for completions.
    #[serde(default)]
    pub default_model: Option<String>,

    /// Request timeout in seconds (default: 120).
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,

    /// Whether this provider is enabled.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tokenizer families used by this provider's models.
    #[serde(default)]
    pub tokenizers: Vec<TokenizerFamily>,

    /// List of available models for this provider.
    #[serde(default)]
    pub models: Vec<ModelCard>,
}

fn default_timeout() -> u64 {
    120
}

fn default_true() -> bool {
    true
}

impl Default for ProviderConfig {
    fn default() -> Self {
        Self {
            name: "unknown".to_string(),
            display_name: "Unknown Provider".to_string(),
            provider_type: ProviderType::AI21,
            api_key_env: None,
            base_url: None,
            base_url_env: None,
            default_model: None,
            timeout_seconds: default_timeout(),
            enabled: true,
            tokenizers: Vec::new(),
            models: Vec::new(),
        }
    }
}

impl ProviderConfig {
    /// Resolve the base URL, preferring the override environment variable.
    pub fn resolved_base_url(&self) -> Option<String> {
        self.base_url_env
            .as_ref()
            .and_then(|var| std::env::var(var).ok())
            .filter(|url| !url.is_empty())
            .or_else(|| self.base_url.clone())
    }

    /// The model this provider selects by default: `default_model`, else the
    /// connector's built-in default.
    pub fn effective_default_model(&self) -> Option<&str> {
        self.default_model
            .as_deref()
            .or_else(|| self.provider_type.builtin_default_model())
    }

    /// Whether `model` is listed under this provider.
    pub fn has_model(&self, model: &str) -> bool {
        self.models.iter().any(|m| m.name == model)
    }
}

// ============================================================================
// Default Configuration
// ============================================================================

/// Default provider and model selections.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DefaultsConfig {
    /// Default provider name.
    #[serde(default = "default_provider")]
    pub provider: String,

    /// Default model name.
    #[serde(default = "default_model")]
    pub model: String,
}

fn default_provider() -> String {
    "ai21".to_string()
}

fn default_model() -> String {
    "j2-ultra".to_string()
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            provider: default_provider(),
            model: default_model(),
        }
    }
}

// ============================================================================
// Root Configuration
// ============================================================================

/// Root configuration structure for models.toml.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ModelsConfig {
    /// Default selections.
    #[serde(default)]
    pub defaults: DefaultsConfig,

    /// List of configured providers.
    #[serde(default)]
    pub providers: Vec<ProviderConfig>,
}

static GLOBAL_CONFIG: OnceLock<ModelsConfig> = OnceLock::new();

impl ModelsConfig {
    /// Load configuration from the default location.
    ///
    /// Searches in order:
    /// 1. `LLM_PREFLIGHT_MODELS_CONFIG` environment variable
    /// 2. `./models.toml`
    /// 3. `~/.llm-preflight/models.toml`
    /// 4. Built-in defaults
    pub fn load() -> Result<Self, ModelConfigError> {
        if let Ok(path) = std::env::var(MODELS_CONFIG_ENV) {
            if Path::new(&path).exists() {
                return Self::from_file(&path);
            }
            warn!(path = %path, "{} points to a missing file", MODELS_CONFIG_ENV);
        }

        let local_path = Path::new("models.toml");
        if local_path.exists() {
            return Self::from_file(local_path);
        }

        if let Some(home) = dirs::home_dir() {
            let user_path = home.join(".llm-preflight").join("models.toml");
            if user_path.exists() {
                return Self::from_file(&user_path);
            }
        }

        Ok(Self::builtin_defaults())
    }

    /// Process-wide configuration, loaded and validated on first use.
    ///
    /// A config file that fails to load or validate is reported and the
    /// built-in defaults are used instead.
    pub fn global() -> &'static Self {
        GLOBAL_CONFIG.get_or_init(|| Self::resolve(Self::load()))
    }

    /// Turn a load result into the configuration in effect: built-in
    /// providers missing from the file are added, then the whole is
    /// validated. Any failure yields the built-in defaults.
    fn resolve(loaded: Result<Self, ModelConfigError>) -> Self {
        let resolved = loaded
            .map(Self::with_builtin_providers)
            .and_then(|config| config.validate().map(|_| config));
        match resolved {
            Ok(config) => {
                debug!(
                    providers = config.providers.len(),
                    "Loaded model configuration"
                );
                config
            }
            Err(e) => {
                warn!(error = %e, "Falling back to built-in model configuration");
                Self::builtin_defaults()
            }
        }
    }

    /// Add every built-in provider whose name this configuration lacks.
    ///
    /// Providers the file does define are kept exactly as written.
    pub fn with_builtin_providers(mut self) -> Self {
        for builtin in Self::builtin_defaults().providers {
            if self.get_provider(&builtin.name).is_none() {
                debug!(provider = %builtin.name, "Adding built-in provider to model configuration");
                self.providers.push(builtin);
            }
        }
        self
    }

    /// Load configuration from a specific file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ModelConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Parse configuration from TOML string.
    pub fn from_toml(toml_str: &str) -> Result<Self, ModelConfigError> {
        toml::from_str(toml_str).map_err(|e| ModelConfigError::ParseError(e.to_string()))
    }

    /// Get built-in default configuration.
    pub fn builtin_defaults() -> Self {
        Self {
            defaults: DefaultsConfig::default(),
            providers: vec![
                ProviderConfig {
                    name: "ai21".to_string(),
                    display_name: "AI21 Studio".to_string(),
                    provider_type: ProviderType::AI21,
                    api_key_env: Some("AI21_API_KEY".to_string()),
                    base_url: Some("https://api.ai21.com/studio/v1".to_string()),
                    base_url_env: Some("AI21_BASE_URL".to_string()),
                    default_model: Some("j2-ultra".to_string()),
                    // Jurassic-2 has no offline tokenizer; estimate from characters.
                    tokenizers: vec![TokenizerFamily::char_ratio("j2-", 4.0)],
                    models: vec![
                        ModelCard::new("j2-ultra", 8192).displayed_as("Jurassic-2 Ultra"),
                        ModelCard::new("j2-mid", 8192).displayed_as("Jurassic-2 Mid"),
                        ModelCard::new("j2-light", 8192).displayed_as("Jurassic-2 Light"),
                    ],
                    ..Default::default()
                },
                ProviderConfig {
                    name: "openai".to_string(),
                    display_name: "OpenAI".to_string(),
                    provider_type: ProviderType::OpenAI,
                    api_key_env: Some("OPENAI_API_KEY".to_string()),
                    base_url: Some("https://api.openai.com/v1".to_string()),
                    base_url_env: Some("OPENAI_API_BASE".to_string()),
                    default_model: Some("gpt-4o-mini".to_string()),
                    tokenizers: vec![
                        TokenizerFamily::new("gpt-4o", TokenizerKind::O200kBase),
                        TokenizerFamily::new("o1", TokenizerKind::O200kBase),
                        TokenizerFamily::new("o3", TokenizerKind::O200kBase),
                        TokenizerFamily::new("gpt-4", TokenizerKind::Cl100kBase),
                        TokenizerFamily::new("gpt-3.5", TokenizerKind::Cl100kBase),
                    ],
                    models: vec![
                        ModelCard::new("gpt-4o", 128000).displayed_as("GPT-4 Omni"),
                        ModelCard::new("gpt-4o-mini", 128000).displayed_as("GPT-4 Omni Mini"),
                        ModelCard::new("gpt-4", 8192).displayed_as("GPT-4"),
                        ModelCard::new("gpt-3.5-turbo", 16385).displayed_as("GPT-3.5 Turbo"),
                    ],
                    ..Default::default()
                },
                ProviderConfig {
                    name: "anthropic".to_string(),
                    display_name: "Anthropic (Claude)".to_string(),
                    provider_type: ProviderType::Anthropic,
                    api_key_env: Some("ANTHROPIC_API_KEY".to_string()),
                    base_url: Some("https://api.anthropic.com".to_string()),
                    base_url_env: Some("ANTHROPIC_API_BASE".to_string()),
                    default_model: Some("claude-3-5-sonnet-20241022".to_string()),
                    tokenizers: vec![TokenizerFamily::char_ratio("claude-", 3.5)],
                    models: vec![
                        ModelCard::new("claude-3-5-sonnet-20241022", 200000)
                            .displayed_as("Claude 3.5 Sonnet"),
                        ModelCard::new("claude-3-5-haiku-20241022", 200000)
                            .displayed_as("Claude 3.5 Haiku"),
                    ],
                    ..Default::default()
                },
            ],
        }
    }

    /// Get a provider by name.
    pub fn get_provider(&self, name: &str) -> Option<&ProviderConfig> {
        self.providers.iter().find(|p| p.name == name)
    }

    /// All models of enabled providers.
    pub fn all_models(&self) -> Vec<(&ProviderConfig, &ModelCard)> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| p.models.iter().map(move |m| (p, m)))
            .collect()
    }

    /// Tokenizer families of enabled providers.
    pub fn tokenizer_families(&self) -> Vec<TokenizerFamily> {
        self.providers
            .iter()
            .filter(|p| p.enabled)
            .flat_map(|p| p.tokenizers.iter().cloned())
            .collect()
    }

    /// Get the default provider and model.
    pub fn default_model(&self) -> Option<(&ProviderConfig, &ModelCard)> {
        let provider = self.get_provider(&self.defaults.provider)?;
        let model = provider
            .models
            .iter()
            .find(|m| m.name == self.defaults.model)?;
        Some((provider, model))
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ModelConfigError> {
        if self.get_provider(&self.defaults.provider).is_none() {
            return Err(ModelConfigError::ProviderNotFound(
                self.defaults.provider.clone(),
            ));
        }

        if self.default_model().is_none() {
            return Err(ModelConfigError::ValidationError(format!(
                "Default model '{}' not found in provider '{}'",
                self.defaults.model, self.defaults.provider
            )));
        }

        let mut seen_providers = HashSet::new();
        // Model ids key the capability table, so they must be unique across providers.
        let mut seen_models = HashSet::new();
        for provider in &self.providers {
            if !seen_providers.insert(&provider.name) {
                return Err(ModelConfigError::ValidationError(format!(
                    "Duplicate provider name: '{}'",
                    provider.name
                )));
            }

            for model in &provider.models {
                if !seen_models.insert(&model.name) {
                    return Err(ModelConfigError::ValidationError(format!(
                        "Duplicate model name '{}' in provider '{}'",
                        model.name, provider.name
                    )));
                }
                if model.context_length == 0 {
                    return Err(ModelConfigError::ValidationError(format!(
                        "Model '{}' must have a positive context_length",
                        model.name
                    )));
                }
            }

            if provider.enabled {
                if let Some(model) = provider.effective_default_model() {
                    if !provider.has_model(model) {
                        return Err(ModelConfigError::ValidationError(format!(
                            "Default model '{}' of provider '{}' has no context_length entry",
                            model, provider.name
                        )));
                    }
                }
            }

            for family in &provider.tokenizers {
                if family.prefix.is_empty() {
                    return Err(ModelConfigError::ValidationError(format!(
                        "Empty tokenizer prefix in provider '{}'",
                        provider.name
                    )));
                }
                if family.kind == TokenizerKind::CharRatio
                    && !(family.chars_per_token.is_finite() && family.chars_per_token > 0.0)
                {
                    return Err(ModelConfigError::ValidationError(format!(
                        "Tokenizer '{}' in provider '{}' needs a positive chars_per_token",
                        family.prefix, provider.name
                    )));
                }
            }
        }

        Ok(())
    }
}

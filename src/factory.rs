//! LLM provider factory for environment-based selection.
//!
//! # Environment Variables
//!
//! ## Provider Selection
//!
//! - `LLM_PREFLIGHT_PROVIDER`: Override provider selection (ai21|mock)
//!
//! ## Provider-Specific Configuration
//!
//! - AI21: `AI21_API_KEY`, `AI21_MODEL`, `AI21_BASE_URL`
//!
//! # Auto-Detection Priority
//!
//! When `LLM_PREFLIGHT_PROVIDER` is not set:
//! 1. Check for AI21_API_KEY → Use AI21
//! 2. Fallback → Use Mock provider
//!
//! # Example
//!
//! ```rust,ignore
//! use llm_preflight::ProviderFactory;
//!
//! // Auto-detect from environment
//! let llm = ProviderFactory::from_env()?;
//!
//! // Explicit provider selection
//! std::env::set_var("LLM_PREFLIGHT_PROVIDER", "mock");
//! let llm = ProviderFactory::from_env()?;
//! ```

use std::sync::Arc;

use tracing::debug;

use crate::error::{LlmError, Result};
use crate::model_config::{ProviderConfig, ProviderType as ConfigProviderType};
use crate::params::RequestParameters;
use crate::providers::ai21::AI21Provider;
use crate::providers::mock::MockProvider;
use crate::traits::LLMProvider;

/// Environment variable that forces a provider.
pub const PROVIDER_ENV: &str = "LLM_PREFLIGHT_PROVIDER";

/// Supported provider types
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderType {
    /// AI21 Studio (Jurassic-2 models)
    AI21,
    /// Mock provider (testing only)
    Mock,
}

impl ProviderType {
    /// Parse provider type from string (case-insensitive)
    ///
    /// # Examples
    ///
    /// ```
    /// use llm_preflight::ProviderType;
    ///
    /// assert_eq!(ProviderType::from_str("ai21"), Some(ProviderType::AI21));
    /// assert_eq!(ProviderType::from_str("AI21-Studio"), Some(ProviderType::AI21));
    /// assert_eq!(ProviderType::from_str("mock"), Some(ProviderType::Mock));
    /// ```
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "ai21" | "ai21-studio" | "ai21_studio" | "jurassic" => Some(Self::AI21),
            "mock" => Some(Self::Mock),
            _ => None,
        }
    }
}

/// Provider factory for creating LLM providers.
///
/// Provides environment-based auto-detection and explicit provider selection.
pub struct ProviderFactory;

impl ProviderFactory {
    /// Auto-detect and create a provider from environment.
    ///
    /// # Priority
    ///
    /// 1. `LLM_PREFLIGHT_PROVIDER` environment variable (explicit selection)
    /// 2. Auto-detect: AI21_API_KEY → Mock
    ///
    /// # Errors
    ///
    /// Returns error if the selected provider is unknown or its configuration
    /// is missing.
    pub fn from_env() -> Result<Arc<dyn LLMProvider>> {
        if let Ok(provider_str) = std::env::var(PROVIDER_ENV) {
            if let Some(provider_type) = ProviderType::from_str(&provider_str) {
                return Self::create(provider_type);
            }
            return Err(LlmError::ConfigError(format!(
                "Unknown provider type: {}. Valid options: ai21, mock",
                provider_str
            )));
        }

        if let Ok(api_key) = std::env::var("AI21_API_KEY") {
            if !api_key.is_empty() {
                return Self::create(ProviderType::AI21);
            }
        }

        debug!("No provider credentials found, falling back to mock provider");
        Ok(Self::create_mock(None))
    }

    /// Create specific provider type.
    ///
    /// # Errors
    ///
    /// Returns error if required configuration for the provider is missing.
    pub fn create(provider_type: ProviderType) -> Result<Arc<dyn LLMProvider>> {
        Self::create_with_model(provider_type, None)
    }

    /// Create specific provider type with a model override.
    ///
    /// Like `create()` but replaces the provider's default model.
    pub fn create_with_model(
        provider_type: ProviderType,
        model: Option<&str>,
    ) -> Result<Arc<dyn LLMProvider>> {
        match provider_type {
            ProviderType::AI21 => Ok(Arc::new(AI21Provider::from_env_with_model(model)?)),
            ProviderType::Mock => Ok(Self::create_mock(model)),
        }
    }

    /// Create provider from TOML configuration.
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - The provider is disabled
    /// - Required API key environment variable is not set
    /// - No connector exists for the configured provider type
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// use llm_preflight::{ModelsConfig, ProviderFactory};
    ///
    /// let config = ModelsConfig::load()?;
    /// let provider_config = config.get_provider("ai21").unwrap();
    /// let llm = ProviderFactory::from_config(provider_config)?;
    /// ```
    pub fn from_config(config: &ProviderConfig) -> Result<Arc<dyn LLMProvider>> {
        if !config.enabled {
            return Err(LlmError::ConfigError(format!(
                "Provider '{}' is disabled in configuration",
                config.name
            )));
        }

        match &config.provider_type {
            ConfigProviderType::AI21 => Ok(Arc::new(AI21Provider::from_config(config)?)),
            ConfigProviderType::Mock => Ok(Self::create_mock(config.default_model.as_deref())),
            other => Err(LlmError::ConfigError(format!(
                "No connector available for provider type '{}' (provider '{}'). \
                 Its models can still be budgeted with TokenBudgetValidator.",
                other, config.name
            ))),
        }
    }

    fn create_mock(model: Option<&str>) -> Arc<dyn LLMProvider> {
        let mut options = RequestParameters::new();
        if let Some(m) = model {
            options.insert("model", m);
        }
        Arc::new(MockProvider::new(&options))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    fn clear_env() {
        std::env::remove_var(PROVIDER_ENV);
        std::env::remove_var("AI21_API_KEY");
        std::env::remove_var("AI21_MODEL");
        std::env::remove_var("AI21_BASE_URL");
    }

    #[test]
    fn test_provider_type_parsing() {
        assert_eq!(ProviderType::from_str("ai21"), Some(ProviderType::AI21));
        assert_eq!(ProviderType::from_str("AI21"), Some(ProviderType::AI21));
        assert_eq!(
            ProviderType::from_str("ai21_studio"),
            Some(ProviderType::AI21)
        );
        assert_eq!(ProviderType::from_str("jurassic"), Some(ProviderType::AI21));
        assert_eq!(ProviderType::from_str("mock"), Some(ProviderType::Mock));
        assert_eq!(ProviderType::from_str("invalid"), None);
        assert_eq!(ProviderType::from_str(""), None);
    }

    #[test]
    fn test_explicit_mock_creation() {
        let llm = ProviderFactory::create(ProviderType::Mock).unwrap();
        assert_eq!(llm.name(), "mock");
        assert_eq!(llm.model(), Some("j2-ultra"));
    }

    #[test]
    fn test_create_with_model_mock() {
        let llm = ProviderFactory::create_with_model(ProviderType::Mock, Some("j2-light")).unwrap();
        assert_eq!(llm.model(), Some("j2-light"));
    }

    #[test]
    #[serial]
    fn test_from_env_fallback_to_mock() {
        clear_env();
        let llm = ProviderFactory::from_env().unwrap();
        assert_eq!(llm.name(), "mock");
    }

    #[test]
    #[serial]
    fn test_ai21_auto_detection() {
        clear_env();
        std::env::set_var("AI21_API_KEY", "test-key");
        std::env::set_var("AI21_MODEL", "j2-mid");

        let llm = ProviderFactory::from_env().unwrap();
        assert_eq!(llm.name(), "ai21");
        assert_eq!(llm.model(), Some("j2-mid"));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_explicit_provider_env() {
        clear_env();
        std::env::set_var("AI21_API_KEY", "test-key");
        std::env::set_var(PROVIDER_ENV, "mock");

        // Explicit selection wins over detected credentials.
        let llm = ProviderFactory::from_env().unwrap();
        assert_eq!(llm.name(), "mock");

        clear_env();
    }

    #[test]
    #[serial]
    fn test_invalid_provider_env() {
        clear_env();
        std::env::set_var(PROVIDER_ENV, "invalid_provider");

        let result = ProviderFactory::from_env();
        assert!(result.is_err());
        if let Err(LlmError::ConfigError(msg)) = result {
            assert!(msg.contains("Unknown provider type"));
        } else {
            panic!("Expected ConfigError");
        }

        clear_env();
    }

    #[test]
    #[serial]
    fn test_ai21_creation_requires_api_key() {
        clear_env();
        std::env::set_var(PROVIDER_ENV, "ai21");

        let result = ProviderFactory::from_env();
        assert!(matches!(result, Err(LlmError::ConfigError(_))));

        clear_env();
    }

    #[test]
    #[serial]
    fn test_create_with_model_ai21() {
        clear_env();
        std::env::set_var("AI21_API_KEY", "test-key");

        let llm = ProviderFactory::create_with_model(ProviderType::AI21, Some("j2-light")).unwrap();
        assert_eq!(llm.model(), Some("j2-light"));
        assert_eq!(
            llm.defaults().get("temperature"),
            Some(&crate::ParamValue::Float(0.0))
        );

        clear_env();
    }

    #[test]
    fn test_from_config_mock() {
        let config = ProviderConfig {
            name: "mock".to_string(),
            provider_type: ConfigProviderType::Mock,
            default_model: Some("j2-mid".to_string()),
            ..Default::default()
        };
        let llm = ProviderFactory::from_config(&config).unwrap();
        assert_eq!(llm.name(), "mock");
        assert_eq!(llm.model(), Some("j2-mid"));
    }

    #[test]
    fn test_from_config_disabled() {
        let config = ProviderConfig {
            name: "ai21".to_string(),
            enabled: false,
            ..Default::default()
        };
        assert!(matches!(
            ProviderFactory::from_config(&config),
            Err(LlmError::ConfigError(msg)) if msg.contains("disabled")
        ));
    }

    #[test]
    fn test_from_config_without_connector() {
        let config = ProviderConfig {
            name: "openai".to_string(),
            provider_type: ConfigProviderType::OpenAI,
            ..Default::default()
        };
        assert!(matches!(
            ProviderFactory::from_config(&config),
            Err(LlmError::ConfigError(_))
        ));
    }

    #[test]
    #[serial]
    fn test_from_config_ai21_requires_api_key() {
        clear_env();
        let config = ProviderConfig {
            name: "ai21".to_string(),
            provider_type: ConfigProviderType::AI21,
            api_key_env: Some("AI21_API_KEY".to_string()),
            ..Default::default()
        };
        assert!(matches!(
            ProviderFactory::from_config(&config),
            Err(LlmError::ConfigError(_))
        ));
    }
}

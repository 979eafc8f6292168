//! llm-preflight - Provider-agnostic LLM facade with token-budget pre-flight
//!
//! Callers issue `complete` and `summarize` requests without binding to one
//! vendor's request/response shape. Before any completion request leaves the
//! process, the facade works out how many completion tokens still fit in the
//! model's context window and fails fast when the prompt alone fills it.
//!
//! This crate provides:
//! - Token counting per model family ([`tokenizer`])
//! - Context windows per model ([`capability`])
//! - The completion-token ceiling ([`budget`])
//! - Default/override parameter merging ([`params`])
//! - The provider-neutral facade ([`provider`]) over vendor connectors ([`providers`])
//!
//! # Providers
//!
//! | Provider | Complete | Summarize | Notes |
//! |----------|----------|-----------|-------|
//! | AI21 Studio | ✓ | ✓ | Jurassic-2 (`j2-ultra`, `j2-mid`, `j2-light`) |
//! | Mock | ✓ | ✓ | Testing (no API calls) |
//!
//! # Example
//!
//! ```ignore
//! use llm_preflight::{AI21Provider, LLMProvider, RequestParameters};
//!
//! let provider = AI21Provider::new("your-api-key", &RequestParameters::new())?;
//!
//! // Pre-flight only: no request is sent.
//! let budget = provider.token_budget("Hello, world!", &RequestParameters::new())?;
//! println!("{} tokens left for the completion", budget.max_completion_tokens);
//!
//! let text = provider.complete("Hello, world!", &RequestParameters::new()).await?;
//! ```
//!
//! # See Also
//!
//! - [`crate::traits`] for provider trait definitions
//! - [`crate::model_config`] for `models.toml`

pub mod budget;
pub mod capability;
pub mod error;
pub mod factory;
pub mod model_config;
pub mod params;
pub mod provider;
pub mod providers;
pub mod response;
pub mod tokenizer;
pub mod traits;

pub use budget::{TokenBudget, TokenBudgetValidator};
pub use capability::{ModelCapability, ModelCapabilityTable};
pub use error::{LlmError, Result};
pub use factory::{ProviderFactory, ProviderType};
pub use model_config::{
    DefaultsConfig, ModelCard, ModelConfigError, ModelsConfig, ProviderConfig,
    ProviderType as ConfigProviderType,
};
pub use params::{merge, ParamValue, RequestParameters};
pub use provider::{ProviderFacade, ProviderProfile};
pub use providers::ai21::{AI21Client, AI21Provider};
pub use providers::mock::{MockCall, MockConnector, MockProvider};
pub use response::{FieldPath, PathSegment};
pub use tokenizer::{
    BpeTokenizer, CharRatioTokenizer, TokenCounter, TokenizerFamily, TokenizerKind,
    TokenizerRegistry,
};
pub use traits::{Connector, LLMProvider};

//! Token counting utilities.
//!
//! Counting is always offline: BPE schemes use the encoders bundled with
//! `tiktoken-rs`, and vendors without a published offline tokenizer use a
//! character-ratio estimate.
//!
//! # Strategy Table
//!
//! A [`TokenizerRegistry`] maps model-family prefixes to a [`TokenCounter`].
//! The longest matching prefix wins, so `gpt-4o` can use `o200k_base` while
//! the rest of `gpt-4` stays on `cl100k_base`:
//!
//! ```text
//! "gpt-4o-mini"  ──►  "gpt-4o" (o200k_base)   ✓ longest match
//!                     "gpt-4"  (cl100k_base)
//! "j2-ultra"     ──►  "j2-"    (char_ratio 4.0)
//! "mystery-1"    ──►  UnsupportedModel
//! ```

use std::fmt::Display;
use std::sync::{Arc, OnceLock};

use serde::{Deserialize, Serialize};
use tiktoken_rs::{cl100k_base, o200k_base, CoreBPE};

use crate::error::{LlmError, Result};
use crate::model_config::{ModelsConfig, ProviderConfig};

/// Tokenizer scheme named in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TokenizerKind {
    /// GPT-4 / GPT-3.5 BPE.
    Cl100kBase,
    /// GPT-4o / o-series BPE.
    O200kBase,
    /// `ceil(chars / chars_per_token)` estimate.
    CharRatio,
}

impl std::fmt::Display for TokenizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TokenizerKind::Cl100kBase => write!(f, "cl100k_base"),
            TokenizerKind::O200kBase => write!(f, "o200k_base"),
            TokenizerKind::CharRatio => write!(f, "char_ratio"),
        }
    }
}

/// One entry of the tokenizer strategy table, as written in `models.toml`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenizerFamily {
    /// Model-id prefix this scheme applies to (e.g. `"j2-"`).
    pub prefix: String,

    /// Tokenizer scheme.
    pub kind: TokenizerKind,

    /// Characters per token, only read for [`TokenizerKind::CharRatio`].
    #[serde(default = "default_chars_per_token")]
    pub chars_per_token: f32,
}

fn default_chars_per_token() -> f32 {
    4.0
}

impl TokenizerFamily {
    /// Create a family entry.
    pub fn new(prefix: impl Into<String>, kind: TokenizerKind) -> Self {
        Self {
            prefix: prefix.into(),
            kind,
            chars_per_token: default_chars_per_token(),
        }
    }

    /// Create a character-ratio family entry.
    pub fn char_ratio(prefix: impl Into<String>, chars_per_token: f32) -> Self {
        Self {
            prefix: prefix.into(),
            kind: TokenizerKind::CharRatio,
            chars_per_token,
        }
    }

    /// Build the counter for this family.
    pub fn counter(&self) -> Result<Arc<dyn TokenCounter>> {
        let counter: Arc<dyn TokenCounter> = match self.kind {
            TokenizerKind::Cl100kBase => Arc::new(BpeTokenizer::cl100k()?),
            TokenizerKind::O200kBase => Arc::new(BpeTokenizer::o200k()?),
            TokenizerKind::CharRatio => Arc::new(CharRatioTokenizer::new(self.chars_per_token)?),
        };
        Ok(counter)
    }
}

/// Counts tokens for one tokenizer scheme.
pub trait TokenCounter: Send + Sync {
    /// Scheme name, for logs and diagnostics.
    fn scheme(&self) -> &str;

    /// Count the number of tokens in the text.
    fn count_tokens(&self, text: &str) -> usize;
}

// ============================================================================
// BPE (tiktoken)
// ============================================================================

static CL100K: OnceLock<std::result::Result<CoreBPE, String>> = OnceLock::new();
static O200K: OnceLock<std::result::Result<CoreBPE, String>> = OnceLock::new();

fn shared_encoder<E: Display>(
    cell: &'static OnceLock<std::result::Result<CoreBPE, String>>,
    name: &str,
    load: impl FnOnce() -> std::result::Result<CoreBPE, E>,
) -> Result<&'static CoreBPE> {
    cell.get_or_init(|| load().map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|e| LlmError::ConfigError(format!("Failed to load {} tokenizer: {}", name, e)))
}

/// Tokenizer backed by a tiktoken BPE encoder.
///
/// Encoders are loaded once per process and shared.
#[derive(Clone)]
pub struct BpeTokenizer {
    encoder: &'static CoreBPE,
    scheme: &'static str,
}

impl BpeTokenizer {
    /// GPT-4 / GPT-3.5 tokenizer.
    pub fn cl100k() -> Result<Self> {
        Ok(Self {
            encoder: shared_encoder(&CL100K, "cl100k_base", cl100k_base)?,
            scheme: "cl100k_base",
        })
    }

    /// GPT-4o tokenizer.
    pub fn o200k() -> Result<Self> {
        Ok(Self {
            encoder: shared_encoder(&O200K, "o200k_base", o200k_base)?,
            scheme: "o200k_base",
        })
    }
}

impl std::fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("scheme", &self.scheme)
            .finish()
    }
}

impl TokenCounter for BpeTokenizer {
    fn scheme(&self) -> &str {
        self.scheme
    }

    fn count_tokens(&self, text: &str) -> usize {
        self.encoder.encode_with_special_tokens(text).len()
    }
}

// ============================================================================
// Character ratio
// ============================================================================

/// Estimates tokens as `ceil(chars / chars_per_token)`.
///
/// Used for vendors whose tokenizer is only reachable through their API.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CharRatioTokenizer {
    chars_per_token: f32,
}

impl CharRatioTokenizer {
    /// Create an estimator. `chars_per_token` must be positive and finite.
    pub fn new(chars_per_token: f32) -> Result<Self> {
        if !chars_per_token.is_finite() || chars_per_token <= 0.0 {
            return Err(LlmError::ConfigError(format!(
                "chars_per_token must be a positive number, got {}",
                chars_per_token
            )));
        }
        Ok(Self { chars_per_token })
    }

    /// Characters per token.
    pub fn chars_per_token(&self) -> f32 {
        self.chars_per_token
    }
}

impl TokenCounter for CharRatioTokenizer {
    fn scheme(&self) -> &str {
        "char_ratio"
    }

    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        let chars = text.chars().count() as f64;
        (chars / self.chars_per_token as f64).ceil() as usize
    }
}

// ============================================================================
// Registry
// ============================================================================

/// Strategy table from model-family prefix to token counter.
///
/// Immutable once built; the process-wide instance comes from [`TokenizerRegistry::global`].
#[derive(Clone, Default)]
pub struct TokenizerRegistry {
    // Sorted by prefix length, longest first.
    families: Vec<(String, Arc<dyn TokenCounter>)>,
}

static GLOBAL_REGISTRY: OnceLock<std::result::Result<TokenizerRegistry, String>> = OnceLock::new();

impl TokenizerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from configured families.
    pub fn from_families(families: &[TokenizerFamily]) -> Result<Self> {
        families.iter().try_fold(Self::new(), |registry, family| {
            Ok(registry.with_family(family.prefix.clone(), family.counter()?))
        })
    }

    /// Build a registry from every enabled provider in the config.
    pub fn from_config(config: &ModelsConfig) -> Result<Self> {
        Self::from_families(&config.tokenizer_families())
    }

    /// Build a registry from one provider's families only.
    pub fn for_provider(provider: &ProviderConfig) -> Result<Self> {
        Self::from_families(&provider.tokenizers)
    }

    /// Process-wide registry derived from [`ModelsConfig::global`].
    pub fn global() -> Result<&'static Self> {
        GLOBAL_REGISTRY
            .get_or_init(|| Self::from_config(ModelsConfig::global()).map_err(|e| e.to_string()))
            .as_ref()
            .map_err(|e| LlmError::ConfigError(e.clone()))
    }

    /// Register a counter for a model-family prefix.
    ///
    /// A later registration for the same prefix replaces the earlier one.
    pub fn with_family(mut self, prefix: impl Into<String>, counter: Arc<dyn TokenCounter>) -> Self {
        let prefix = prefix.into();
        self.families.retain(|(p, _)| *p != prefix);
        self.families.push((prefix, counter));
        self.families
            .sort_by(|(a, _), (b, _)| b.len().cmp(&a.len()).then_with(|| a.cmp(b)));
        self
    }

    /// Find the counter for a model, by longest matching prefix.
    pub fn resolve(&self, model: &str) -> Result<&dyn TokenCounter> {
        self.families
            .iter()
            .find(|(prefix, _)| model.starts_with(prefix.as_str()))
            .map(|(_, counter)| counter.as_ref())
            .ok_or_else(|| LlmError::UnsupportedModel(model.to_string()))
    }

    /// Count tokens in `text` using the scheme for `model`.
    pub fn count_tokens(&self, text: &str, model: &str) -> Result<usize> {
        Ok(self.resolve(model)?.count_tokens(text))
    }

    /// Registered family prefixes, longest first.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.families.iter().map(|(p, _)| p.as_str())
    }

    /// Number of registered families.
    pub fn len(&self) -> usize {
        self.families.len()
    }

    /// Whether no family is registered.
    pub fn is_empty(&self) -> bool {
        self.families.is_empty()
    }
}

impl std::fmt::Debug for TokenizerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_map()
            .entries(self.families.iter().map(|(p, c)| (p, c.scheme())))
            .finish()
    }
}

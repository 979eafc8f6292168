//! Provider traits.
//!
//! Two seams separate what every provider shares from what each vendor does
//! differently:
//!
//! ```text
//!   caller ──► LLMProvider (facade: merge, pre-flight, projection)
//!                   │
//!                   ▼
//!              Connector (vendor transport: one request, raw JSON back)
//! ```
//!
//! - [`LLMProvider`]: what callers use. Returns plain text.
//! - [`Connector`]: what a vendor integration implements. Returns the raw
//!   response so the facade can project the text out of it.

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;
use crate::params::RequestParameters;

/// Transport to a vendor's completion and summarization endpoints.
///
/// Implementations send exactly one request per call and surface vendor
/// failures as [`LlmError`](crate::LlmError) without retrying.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Name of the vendor behind this connector.
    fn name(&self) -> &str;

    /// Send a completion request. `params` is the fully merged parameter set,
    /// including the model and the completion-token bound.
    async fn complete(&self, prompt: &str, params: &RequestParameters) -> Result<JsonValue>;

    /// Send a summarization request for `text` of the given source `mode`.
    async fn summarize(
        &self,
        text: &str,
        mode: &str,
        params: &RequestParameters,
    ) -> Result<JsonValue>;
}

/// Provider-agnostic text completion and summarization.
#[async_trait]
pub trait LLMProvider: Send + Sync {
    /// Get the name of this provider.
    fn name(&self) -> &str;

    /// Parameters applied to every call unless overridden.
    fn defaults(&self) -> &RequestParameters;

    /// Model used when a call does not override it.
    fn model(&self) -> Option<&str> {
        self.defaults().get_str("model")
    }

    /// Complete `prompt`, returning the first completion's text.
    ///
    /// `params` are per-call overrides merged over [`defaults`](Self::defaults).
    async fn complete(&self, prompt: &str, params: &RequestParameters) -> Result<String>;

    /// Summarize `text`, returning the summary.
    async fn summarize(&self, text: &str, params: &RequestParameters) -> Result<String>;
}

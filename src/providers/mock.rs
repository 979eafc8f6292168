//! Mock connector for testing.
//!
//! Completions and summaries are served from separate FIFO queues; every
//! call is recorded so tests can assert on exactly what the facade sent.
//! When a queue is empty the connector answers with a canned AI21-shaped
//! response.
//!
//! ```text
//! add_response() / add_completion() / add_error()  ──►  completions  ──►  complete()
//! add_summary() / add_summary_error()               ──►  summaries    ──►  summarize()
//!                                                                             │
//!                                                             calls()  ◄──  log
//! ```

use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{json, Value as JsonValue};
use tokio::sync::Mutex;

use crate::error::Result;
use crate::params::RequestParameters;
use crate::provider::{ProviderFacade, ProviderProfile};
use crate::providers::ai21;
use crate::traits::Connector;

/// A request received by [`MockConnector`].
#[derive(Debug, Clone, PartialEq)]
pub enum MockCall {
    /// A completion request.
    Complete {
        prompt: String,
        params: RequestParameters,
    },
    /// A summarization request.
    Summarize {
        text: String,
        mode: String,
        params: RequestParameters,
    },
}

/// Connector that replays queued responses without any network access.
#[derive(Debug, Clone, Default)]
pub struct MockConnector {
    completions: Arc<Mutex<Vec<Result<JsonValue>>>>,
    summaries: Arc<Mutex<Vec<Result<JsonValue>>>>,
    calls: Arc<Mutex<Vec<MockCall>>>,
}

/// Facade over a [`MockConnector`].
pub type MockProvider = ProviderFacade<MockConnector>;

/// AI21-shaped profile named `mock`, so canned responses look like AI21's.
pub fn profile() -> ProviderProfile {
    ProviderProfile {
        name: "mock".to_string(),
        ..ai21::profile()
    }
}

impl MockConnector {
    /// Create a mock connector with empty queues.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a raw response for the next `complete` call.
    pub async fn add_response(&self, response: JsonValue) {
        self.completions.lock().await.push(Ok(response));
    }

    /// Queue a completion response carrying `text`.
    pub async fn add_completion(&self, text: impl Into<String>) {
        self.add_response(completion_response(&text.into())).await;
    }

    /// Queue a raw response for the next `summarize` call.
    pub async fn add_summary_response(&self, response: JsonValue) {
        self.summaries.lock().await.push(Ok(response));
    }

    /// Queue a summarization response carrying `summary`.
    pub async fn add_summary(&self, summary: impl Into<String>) {
        self.add_summary_response(json!({ "summary": summary.into() }))
            .await;
    }

    /// Queue an error for the next `complete` call.
    pub async fn add_error(&self, error: crate::LlmError) {
        self.completions.lock().await.push(Err(error));
    }

    /// Queue an error for the next `summarize` call.
    pub async fn add_summary_error(&self, error: crate::LlmError) {
        self.summaries.lock().await.push(Err(error));
    }

    /// Every call received so far, oldest first.
    pub async fn calls(&self) -> Vec<MockCall> {
        self.calls.lock().await.clone()
    }
}

async fn next_or(
    queue: &Mutex<Vec<Result<JsonValue>>>,
    fallback: JsonValue,
) -> Result<JsonValue> {
    let mut responses = queue.lock().await;
    if responses.is_empty() {
        Ok(fallback)
    } else {
        responses.remove(0)
    }
}

fn completion_response(text: &str) -> JsonValue {
    json!({ "completions": [{ "data": { "text": text } }] })
}

impl MockProvider {
    /// Mock facade with the given default options.
    pub fn new(default_options: &RequestParameters) -> Self {
        ProviderFacade::with_connector(profile(), MockConnector::new(), default_options)
    }
}

#[async_trait]
impl Connector for MockConnector {
    fn name(&self) -> &str {
        "mock"
    }

    async fn complete(&self, prompt: &str, params: &RequestParameters) -> Result<JsonValue> {
        self.calls.lock().await.push(MockCall::Complete {
            prompt: prompt.to_string(),
            params: params.clone(),
        });
        next_or(&self.completions, completion_response("Mock response")).await
    }

    async fn summarize(
        &self,
        text: &str,
        mode: &str,
        params: &RequestParameters,
    ) -> Result<JsonValue> {
        self.calls.lock().await.push(MockCall::Summarize {
            text: text.to_string(),
            mode: mode.to_string(),
            params: params.clone(),
        });
        next_or(&self.summaries, json!({ "summary": "Mock summary" })).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LlmError;
    use crate::traits::LLMProvider;

    #[tokio::test]
    async fn test_queue_is_fifo() {
        let connector = MockConnector::new();
        connector.add_completion("first").await;
        connector.add_completion("second").await;

        let params = RequestParameters::new();
        let a = connector.complete("p", &params).await.unwrap();
        let b = connector.complete("p", &params).await.unwrap();
        assert_eq!(a["completions"][0]["data"]["text"], "first");
        assert_eq!(b["completions"][0]["data"]["text"], "second");
    }

    #[tokio::test]
    async fn test_default_responses() {
        let connector = MockConnector::new();
        let params = RequestParameters::new();
        let c = connector.complete("p", &params).await.unwrap();
        let s = connector.summarize("t", "TEXT", &params).await.unwrap();
        assert_eq!(c["completions"][0]["data"]["text"], "Mock response");
        assert_eq!(s["summary"], "Mock summary");
    }

    #[tokio::test]
    async fn test_records_calls() {
        let connector = MockConnector::new();
        let params = RequestParameters::new().with("maxTokens", 5);
        connector.complete("hello", &params).await.unwrap();
        connector.summarize("text", "TEXT", &params).await.unwrap();

        assert_eq!(
            connector.calls().await,
            vec![
                MockCall::Complete {
                    prompt: "hello".to_string(),
                    params: params.clone(),
                },
                MockCall::Summarize {
                    text: "text".to_string(),
                    mode: "TEXT".to_string(),
                    params,
                },
            ]
        );
    }

    #[tokio::test]
    async fn test_queued_error() {
        let connector = MockConnector::new();
        connector
            .add_error(LlmError::AuthError("bad key".to_string()))
            .await;
        assert!(matches!(
            connector.complete("p", &RequestParameters::new()).await,
            Err(LlmError::AuthError(_))
        ));
    }

    #[tokio::test]
    async fn test_queued_summary_error() {
        let connector = MockConnector::new();
        connector
            .add_summary_error(LlmError::RateLimited("later".to_string()))
            .await;

        let params = RequestParameters::new();
        assert!(connector.complete("p", &params).await.is_ok());
        assert!(matches!(
            connector.summarize("t", "TEXT", &params).await,
            Err(LlmError::RateLimited(_))
        ));
    }

    #[tokio::test]
    async fn test_interleaved_queues_stay_separate() {
        let provider = MockProvider::new(&RequestParameters::new());
        let connector = provider.connector();
        connector.add_summary("summary one").await;
        connector.add_completion("completion one").await;
        connector.add_summary("summary two").await;
        connector.add_completion("completion two").await;

        let params = RequestParameters::new();
        assert_eq!(provider.complete("a", &params).await.unwrap(), "completion one");
        assert_eq!(provider.summarize("b", &params).await.unwrap(), "summary one");
        assert_eq!(provider.summarize("c", &params).await.unwrap(), "summary two");
        assert_eq!(provider.complete("d", &params).await.unwrap(), "completion two");

        // Both queues drained: canned answers again.
        assert_eq!(provider.complete("e", &params).await.unwrap(), "Mock response");
        assert_eq!(provider.summarize("f", &params).await.unwrap(), "Mock summary");
        assert_eq!(connector.calls().await.len(), 6);
    }

    #[tokio::test]
    async fn test_mock_provider_end_to_end() {
        let provider = MockProvider::new(&RequestParameters::new());
        provider.connector().add_summary("tl;dr").await;

        assert_eq!(provider.name(), "mock");
        assert_eq!(provider.model(), Some("j2-ultra"));
        assert_eq!(
            provider
                .complete("Tell me a joke", &RequestParameters::new())
                .await
                .unwrap(),
            "Mock response"
        );
        assert_eq!(
            provider
                .summarize("Long article", &RequestParameters::new())
                .await
                .unwrap(),
            "tl;dr"
        );
    }
}

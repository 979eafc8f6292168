//! End-to-end tests for the token-budget pre-flight through the facade.
//!
//! Every test drives `complete`/`summarize` through a `MockConnector`, so the
//! requests the facade would send can be inspected without any network.

use llm_preflight::{
    merge, LLMProvider, LlmError, MockCall, MockConnector, ModelCapabilityTable, ParamValue,
    ProviderFacade, RequestParameters, TokenBudgetValidator, TokenizerFamily, TokenizerRegistry,
};

/// Window of 100 tokens, one character per token.
fn test_validator() -> TokenBudgetValidator {
    TokenBudgetValidator::new(
        [("test-model", 100), ("test-small", 8)].into_iter().collect(),
        TokenizerRegistry::from_families(&[TokenizerFamily::char_ratio("test-", 1.0)]).unwrap(),
    )
}

fn mock_provider() -> ProviderFacade<MockConnector> {
    ProviderFacade::with_connector(
        llm_preflight::providers::mock::profile(),
        MockConnector::new(),
        &RequestParameters::new().with("model", "test-model"),
    )
    .with_validator(test_validator())
}

async fn last_params(provider: &ProviderFacade<MockConnector>) -> RequestParameters {
    match provider.connector().calls().await.pop() {
        Some(MockCall::Complete { params, .. }) | Some(MockCall::Summarize { params, .. }) => {
            params
        }
        None => panic!("no call recorded"),
    }
}

#[tokio::test]
async fn test_scenario_ceiling_fills_default() {
    let provider = mock_provider();
    provider.connector().add_completion("done").await;

    let text = provider
        .complete(&"w".repeat(30), &RequestParameters::new())
        .await
        .unwrap();

    assert_eq!(text, "done");
    assert_eq!(last_params(&provider).await.get_i64("maxTokens"), Some(70));
}

#[tokio::test]
async fn test_scenario_prompt_fills_window() {
    let provider = mock_provider();

    let err = provider
        .complete(&"w".repeat(100), &RequestParameters::new())
        .await
        .unwrap_err();

    match err {
        LlmError::PromptTooLong {
            prompt_tokens,
            max_total_tokens,
        } => {
            assert_eq!(prompt_tokens, 100);
            assert_eq!(max_total_tokens, 100);
        }
        other => panic!("Expected PromptTooLong, got {:?}", other),
    }
    assert!(provider.connector().calls().await.is_empty());
}

#[tokio::test]
async fn test_override_model_uses_its_own_window() {
    let provider = mock_provider();
    provider.connector().add_completion("ok").await;

    // Fits in test-model's window, not in test-small's.
    let prompt = "w".repeat(8);
    assert!(provider
        .complete(&prompt, &RequestParameters::new().with("model", "test-small"))
        .await
        .is_err());

    provider
        .complete(&prompt, &RequestParameters::new())
        .await
        .unwrap();
    assert_eq!(last_params(&provider).await.get_i64("maxTokens"), Some(92));
}

#[tokio::test]
async fn test_ceiling_tracks_prompt_length() {
    let provider = mock_provider();

    for t in [0usize, 1, 50, 98, 99] {
        provider.connector().add_completion("x").await;
        provider
            .complete(&"w".repeat(t), &RequestParameters::new())
            .await
            .unwrap();
        assert_eq!(
            last_params(&provider).await.get_i64("maxTokens"),
            Some((100 - t) as i64),
            "prompt of {} tokens",
            t
        );
    }
}

#[tokio::test]
async fn test_overrides_reach_connector_merged() {
    let provider = mock_provider();
    provider.connector().add_completion("x").await;

    let overrides = RequestParameters::new()
        .with("temperature", 0.7)
        .with("stopSequences", "##");
    provider.complete("hello", &overrides).await.unwrap();

    let sent = last_params(&provider).await;
    let expected = merge(provider.defaults(), &overrides).with("maxTokens", 95);
    assert_eq!(sent, expected);
    assert_eq!(sent.get("temperature"), Some(&ParamValue::Float(0.7)));

    // Defaults are untouched by the call.
    assert_eq!(
        provider.defaults().get("temperature"),
        Some(&ParamValue::Float(0.0))
    );
}

#[tokio::test]
async fn test_summarize_skips_preflight() {
    let provider = mock_provider();
    provider.connector().add_summary("brief").await;

    // Far larger than any window: summarization is not budgeted.
    let summary = provider
        .summarize(&"w".repeat(10_000), &RequestParameters::new())
        .await
        .unwrap();
    assert_eq!(summary, "brief");
    assert!(last_params(&provider).await.is_empty());
}

#[tokio::test]
async fn test_preflight_errors_are_flagged() {
    let provider = mock_provider();

    let unknown = provider
        .complete("hi", &RequestParameters::new().with("model", "test-missing"))
        .await
        .unwrap_err();
    assert!(matches!(unknown, LlmError::UnknownModel(_)));
    assert!(unknown.is_preflight());

    let too_long = provider
        .token_budget(&"w".repeat(150), &RequestParameters::new())
        .unwrap_err();
    assert!(too_long.is_preflight());
    assert!(too_long.user_description().contains("150/100"));
}

#[test]
fn test_global_tables_cover_ai21_models() {
    let table = ModelCapabilityTable::global();
    let validator = TokenBudgetValidator::global();

    for model in ["j2-ultra", "j2-mid", "j2-light"] {
        assert_eq!(table.max_total_tokens(model).unwrap(), 8192);
        // 400 characters at 4 chars/token.
        assert_eq!(
            validator
                .compute_max_completion_tokens(&"w".repeat(400), model)
                .unwrap(),
            8092
        );
    }
}

//! Token-budget pre-flight example
//!
//! Run with: cargo run --example preflight -- "Write a haiku about Rust"
//! Optional: AI21_API_KEY environment variable to send the request

use llm_preflight::{AI21Provider, LLMProvider, RequestParameters};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let prompt = std::env::args()
        .skip(1)
        .collect::<Vec<_>>()
        .join(" ");
    let prompt = if prompt.is_empty() {
        "Write a haiku about context windows.".to_string()
    } else {
        prompt
    };

    println!("🧮 llm-preflight - Token Budget Example\n");

    let api_key = std::env::var("AI21_API_KEY").ok().filter(|k| !k.is_empty());

    // The budget needs no credentials; a placeholder key is enough offline.
    let provider = match &api_key {
        Some(_) => AI21Provider::from_env()?,
        None => AI21Provider::new("offline", &RequestParameters::new())?,
    };

    let budget = provider.token_budget(&prompt, &RequestParameters::new())?;
    println!("📝 Prompt: {}", prompt);
    println!(
        "📊 Model {}: {} prompt + {} completion = {} window",
        provider.model().unwrap_or("?"),
        budget.prompt_tokens,
        budget.max_completion_tokens,
        budget.max_total_tokens
    );

    if api_key.is_none() {
        println!("\nSet AI21_API_KEY to send the completion and summary requests.");
        return Ok(());
    }

    println!("\nSending request to AI21 Studio...");
    let completion = provider.complete(&prompt, &RequestParameters::new()).await?;
    println!("\n✨ Completion: {}", completion);

    let summary = provider.summarize(&completion, &RequestParameters::new()).await?;
    println!("📌 Summary: {}", summary);

    Ok(())
}

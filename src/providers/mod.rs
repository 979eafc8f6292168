//! LLM provider implementations.

pub mod ai21;
pub use ai21::{AI21Client, AI21Provider};

pub mod mock;
pub use mock::{MockCall, MockConnector, MockProvider};

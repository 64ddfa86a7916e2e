//! LLM completion service for promptpack
//!
//! All network access goes through the [`LlmBackend`] trait. The production
//! backend talks to an OpenAI-compatible chat completions endpoint and is
//! wrapped in a [`BudgetedBackend`] that caps calls per process.

mod budgeted_backend;
mod http_client;
mod openai_backend;
mod types;

pub use budgeted_backend::BudgetedBackend;
pub use promptpack_utils::error::LlmError;
pub use types::{LlmBackend, LlmInvocation, LlmResult, Message, Role};

use openai_backend::OpenAiBackend;
use promptpack_config::Config;
use std::time::Duration;
use tracing::debug;

/// Build the configured backend.
///
/// # Errors
///
/// Returns `LlmError::Misconfiguration` when the API key is missing or the
/// HTTP client cannot be built.
pub fn from_config(config: &Config) -> Result<Box<dyn LlmBackend>, LlmError> {
    let backend = OpenAiBackend::new_from_config(config)?;
    Ok(Box::new(BudgetedBackend::new(
        Box::new(backend),
        config.llm_budget(),
    )))
}

/// Single-turn completion: one system message, one user message, text out.
///
/// `max_completion` is sent as the request's `max_tokens`, so callers size
/// the reply to the room their prompt leaves in the context window.
pub async fn complete(
    backend: &dyn LlmBackend,
    model: &str,
    timeout: Duration,
    system: &str,
    user: &str,
    max_completion: usize,
) -> Result<String, LlmError> {
    let inv = LlmInvocation::new(
        "answer",
        model,
        timeout,
        vec![Message::system(system), Message::user(user)],
    )
    .with_metadata("max_tokens", serde_json::json!(max_completion.max(1)));
    let result = backend.invoke(inv).await?;
    debug!(
        provider = %result.provider,
        model = %result.model_used,
        chars = result.raw_response.len(),
        "Completion received"
    );
    Ok(result.raw_response)
}

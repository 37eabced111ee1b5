//! Model provider traits.

use async_trait::async_trait;

use crate::error::Result;

/// Completion returned by a model provider.
#[derive(Debug, Clone)]
pub struct LlmCompletion {
    /// Model output, verbatim.
    pub content: String,
    /// Model that produced it.
    pub model: String,
}

/// LLM client interface.
///
/// Implementations submit a fixed system instruction plus the raw user turn
/// and return the model's text untouched. The analyzers on top expect a
/// JSON-only response and parse strictly on their side; a transport failure
/// here is what triggers their keyword fallback.
#[async_trait]
pub trait LlmClient: Send + Sync {
    /// Run a completion with a system instruction and a single user turn.
    async fn complete(&self, system: &str, user: &str) -> Result<LlmCompletion>;

    /// Model identifier, used to tag analysis results.
    fn model_name(&self) -> &str;
}

//! Rig LLM client adapter.
//!
//! Wraps Rig's Agent for integration with the `LlmClient` trait. The
//! analyzers hand over a fixed system instruction and the raw user query;
//! everything else (JSON contract enforcement, fallback) happens above this
//! layer.

use async_trait::async_trait;

use switchboard_core::{
    config::LlmConfig,
    traits::{LlmClient, LlmCompletion},
    Error, Result,
};

// Import required Rig traits
use rig::client::{CompletionClient, ProviderClient};
use rig::completion::Prompt;

/// Provider type for Rig clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RigProvider {
    OpenAI,
    Anthropic,
}

/// Configuration for the Rig client.
#[derive(Debug, Clone)]
pub struct RigConfig {
    /// Provider to use.
    pub provider: RigProvider,
    /// Model name.
    pub model: String,
}

impl RigConfig {
    /// Create config for OpenAI.
    pub fn openai(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::OpenAI,
            model: model.into(),
        }
    }

    /// Create config for Anthropic.
    pub fn anthropic(model: impl Into<String>) -> Self {
        Self {
            provider: RigProvider::Anthropic,
            model: model.into(),
        }
    }

    /// Build from the application config section.
    pub fn from_app(config: &LlmConfig) -> Result<Self> {
        match config.provider.as_str() {
            "openai" => Ok(Self::openai(&config.model)),
            "anthropic" => Ok(Self::anthropic(&config.model)),
            other => Err(Error::model_provider(format!(
                "Unknown provider '{}'",
                other
            ))),
        }
    }
}

/// Rig-based LLM client.
pub struct RigLlmClient {
    config: RigConfig,
}

impl RigLlmClient {
    /// Create a new Rig client with the given configuration.
    pub fn new(config: RigConfig) -> Self {
        Self { config }
    }

    /// Call OpenAI via Rig.
    async fn call_openai(&self, system: &str, user: &str) -> Result<String> {
        use rig::providers::openai;

        // Check env var first to avoid panic
        if std::env::var("OPENAI_API_KEY").is_err() {
            return Err(Error::model_provider("OPENAI_API_KEY not set"));
        }

        let client = openai::Client::from_env();
        let agent = client.agent(&self.config.model).preamble(system).build();

        agent
            .prompt(user)
            .await
            .map_err(|e| Error::model_provider(format!("OpenAI error: {}", e)))
    }

    /// Call Anthropic via Rig.
    async fn call_anthropic(&self, system: &str, user: &str) -> Result<String> {
        use rig::providers::anthropic;

        // Check env var first to avoid panic
        if std::env::var("ANTHROPIC_API_KEY").is_err() {
            return Err(Error::model_provider("ANTHROPIC_API_KEY not set"));
        }

        let client = anthropic::Client::from_env();
        let agent = client.agent(&self.config.model).preamble(system).build();

        agent
            .prompt(user)
            .await
            .map_err(|e| Error::model_provider(format!("Anthropic error: {}", e)))
    }
}

#[async_trait]
impl LlmClient for RigLlmClient {
    async fn complete(&self, system: &str, user: &str) -> Result<LlmCompletion> {
        tracing::debug!(
            provider = ?self.config.provider,
            model = %self.config.model,
            user_len = user.len(),
            "Calling LLM"
        );

        let content = match self.config.provider {
            RigProvider::OpenAI => self.call_openai(system, user).await?,
            RigProvider::Anthropic => self.call_anthropic(system, user).await?,
        };

        Ok(LlmCompletion {
            content,
            model: self.config.model.clone(),
        })
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

/// Client used when no provider credentials are configured.
///
/// Every completion fails with a provider error, which sends the analyzers
/// straight to their keyword fallback.
pub struct NullLlm;

#[async_trait]
impl LlmClient for NullLlm {
    async fn complete(&self, _system: &str, _user: &str) -> Result<LlmCompletion> {
        Err(Error::model_provider("no model provider configured"))
    }

    fn model_name(&self) -> &str {
        "none"
    }
}

/// Create a default LLM client based on available API keys.
pub fn create_default_client(config: &LlmConfig) -> Result<RigLlmClient> {
    if std::env::var("OPENAI_API_KEY").is_ok() || std::env::var("ANTHROPIC_API_KEY").is_ok() {
        Ok(RigLlmClient::new(RigConfig::from_app(config)?))
    } else {
        Err(Error::model_provider(
            "No API key found. Set OPENAI_API_KEY or ANTHROPIC_API_KEY",
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_from_app() {
        let config = LlmConfig {
            provider: "anthropic".to_string(),
            model: "claude-3-haiku-20240307".to_string(),
        };
        let rig = RigConfig::from_app(&config).unwrap();
        assert_eq!(rig.provider, RigProvider::Anthropic);
        assert_eq!(rig.model, "claude-3-haiku-20240307");
    }

    #[test]
    fn test_config_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".to_string(),
            model: "v1".to_string(),
        };
        assert!(RigConfig::from_app(&config).is_err());
    }

    #[tokio::test]
    async fn test_null_llm_always_fails() {
        let client = NullLlm;
        let result = client.complete("system", "user").await;
        assert!(result.is_err());
        assert_eq!(client.model_name(), "none");
    }
}

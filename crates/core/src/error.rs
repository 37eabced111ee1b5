//! Error types for Switchboard.

use thiserror::Error;

/// Result type alias using Switchboard's Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Core error type for Switchboard.
#[derive(Error, Debug)]
pub enum Error {
    // =========================================================================
    // Analysis Errors
    // =========================================================================
    #[error("Classification failed: {0}")]
    Classification(String),

    #[error("Tool analysis failed: {0}")]
    ToolAnalysis(String),

    // =========================================================================
    // Resolution Errors
    // =========================================================================
    #[error("No service provides tool '{0}'")]
    ToolUnmapped(String),

    #[error("All services providing tool '{tool}' are disabled")]
    ServiceDisabled {
        tool: String,
        candidates: Vec<String>,
    },

    // =========================================================================
    // Installation Errors
    // =========================================================================
    #[error("Installation check for service '{service_id}' failed: {detail}")]
    Installation { service_id: String, detail: String },

    #[error("Service '{0}' is not installed")]
    NotInstalled(String),

    // =========================================================================
    // Execution Errors
    // =========================================================================
    #[error("Tool call on service '{0}' timed out")]
    ExecutionTimeout(String),

    #[error("Transport failure talking to service '{service_id}': {detail}")]
    ExecutionTransport { service_id: String, detail: String },

    #[error("Service rejected the call: [{code}] {message}")]
    ExecutionRejected { code: i64, message: String },

    // =========================================================================
    // Model Provider Errors
    // =========================================================================
    #[error("Model provider error: {0}")]
    ModelProvider(String),

    // =========================================================================
    // Generic Errors
    // =========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl Error {
    /// Create a classification error.
    pub fn classification(msg: impl Into<String>) -> Self {
        Self::Classification(msg.into())
    }

    /// Create a tool analysis error.
    pub fn tool_analysis(msg: impl Into<String>) -> Self {
        Self::ToolAnalysis(msg.into())
    }

    /// Create an installation error.
    pub fn installation(service_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::Installation {
            service_id: service_id.into(),
            detail: detail.into(),
        }
    }

    /// Create a transport error.
    pub fn transport(service_id: impl Into<String>, detail: impl Into<String>) -> Self {
        Self::ExecutionTransport {
            service_id: service_id.into(),
            detail: detail.into(),
        }
    }

    /// Create a model provider error.
    pub fn model_provider(msg: impl Into<String>) -> Self {
        Self::ModelProvider(msg.into())
    }

    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }

    /// Create an internal error.
    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether a failed tool call may be attempted again.
    ///
    /// Deadline and transport failures are retryable; a rejection from the
    /// service itself is an application-level verdict and is final.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::ExecutionTimeout(_) | Self::ExecutionTransport { .. }
        )
    }
}

use serde::{Deserialize, Serialize};

use super::call::ToolCallResponse;
use super::intent::IntentResult;
use super::tool::ToolRequirement;
use crate::error::Error;

// =============================================================================
// Caller-Facing Outcome
// =============================================================================

/// Kind tag for a caller-facing error entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OutcomeErrorKind {
    ToolUnmapped,
    ServiceDisabled,
    Installation,
    ExecutionTimeout,
    ExecutionTransport,
    ExecutionRejected,
    InvalidArguments,
    NoToolIdentified,
    PipelineTimeout,
}

/// A typed error rendered to the caller alongside any partial successes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OutcomeError {
    /// Error kind.
    pub kind: OutcomeErrorKind,
    /// Diagnostic message.
    pub message: String,
    /// Suggested remedy, when one exists.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub remedy: Option<String>,
}

impl OutcomeError {
    /// Create an error entry without a remedy.
    pub fn new(kind: OutcomeErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            remedy: None,
        }
    }

    /// Attach a remedy suggestion.
    pub fn with_remedy(mut self, remedy: impl Into<String>) -> Self {
        self.remedy = Some(remedy.into());
        self
    }
}

impl From<&Error> for OutcomeError {
    fn from(err: &Error) -> Self {
        match err {
            Error::ToolUnmapped(tool) => OutcomeError::new(
                OutcomeErrorKind::ToolUnmapped,
                format!("no configured service provides the capability '{tool}'"),
            ),
            Error::ServiceDisabled { tool, candidates } => OutcomeError::new(
                OutcomeErrorKind::ServiceDisabled,
                format!("every service providing '{tool}' is currently disabled"),
            )
            .with_remedy(format!("enable the service: {}", candidates.join(", "))),
            Error::Installation { service_id, detail } => OutcomeError::new(
                OutcomeErrorKind::Installation,
                format!("service '{service_id}' dependency check failed: {detail}"),
            )
            .with_remedy(format!("install the runtime dependency of '{service_id}'")),
            Error::NotInstalled(service_id) => OutcomeError::new(
                OutcomeErrorKind::Installation,
                format!("service '{service_id}' is not installed"),
            )
            .with_remedy(format!("install the runtime dependency of '{service_id}'")),
            Error::ExecutionTimeout(service_id) => OutcomeError::new(
                OutcomeErrorKind::ExecutionTimeout,
                format!("tool call on service '{service_id}' timed out"),
            ),
            Error::ExecutionTransport { service_id, detail } => OutcomeError::new(
                OutcomeErrorKind::ExecutionTransport,
                format!("lost contact with service '{service_id}': {detail}"),
            ),
            Error::ExecutionRejected { code, message } => OutcomeError::new(
                OutcomeErrorKind::ExecutionRejected,
                format!("service rejected the call: [{code}] {message}"),
            ),
            other => OutcomeError::new(OutcomeErrorKind::ExecutionTransport, other.to_string()),
        }
    }
}

/// Structured result the surrounding application renders.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryOutcome {
    /// Classification of the query.
    pub intent: IntentResult,
    /// Tools the analyzer named, in preference order.
    pub tool_requirements: Vec<ToolRequirement>,
    /// Responses from dispatched calls, including service-side rejections.
    pub execution_results: Vec<ToolCallResponse>,
    /// Typed errors encountered along the way.
    pub errors: Vec<OutcomeError>,
}

impl QueryOutcome {
    /// Create an outcome carrying only a classification.
    pub fn for_intent(intent: IntentResult) -> Self {
        Self {
            intent,
            tool_requirements: Vec::new(),
            execution_results: Vec::new(),
            errors: Vec::new(),
        }
    }

    /// Whether every dispatched call succeeded and no errors were recorded.
    pub fn is_fully_successful(&self) -> bool {
        self.errors.is_empty() && self.execution_results.iter().all(|r| r.is_success())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_error_carries_remedy() {
        let err = Error::ServiceDisabled {
            tool: "create_file".to_string(),
            candidates: vec!["file-service".to_string()],
        };
        let outcome_err = OutcomeError::from(&err);
        assert_eq!(outcome_err.kind, OutcomeErrorKind::ServiceDisabled);
        assert!(outcome_err.remedy.as_deref().unwrap().contains("file-service"));
    }

    #[test]
    fn test_unmapped_error_has_no_remedy() {
        let err = Error::ToolUnmapped("teleport".to_string());
        let outcome_err = OutcomeError::from(&err);
        assert_eq!(outcome_err.kind, OutcomeErrorKind::ToolUnmapped);
        assert!(outcome_err.remedy.is_none());
    }
}

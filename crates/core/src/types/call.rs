use serde::{Deserialize, Serialize};
use serde_json::Value;

// =============================================================================
// Tool Call Types
// =============================================================================

/// A single tool invocation bound for a service peer.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallRequest {
    /// Correlation id, unique per call.
    pub request_id: String,
    /// Tool to invoke.
    pub tool_name: String,
    /// Tool arguments as a JSON object.
    pub arguments: Value,
}

impl ToolCallRequest {
    /// Create a request with a fresh correlation id.
    pub fn new(tool_name: impl Into<String>, arguments: Value) -> Self {
        Self {
            request_id: uuid::Uuid::new_v4().to_string(),
            tool_name: tool_name.into(),
            arguments,
        }
    }
}

/// Application-level error reported by a service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallError {
    /// Service-defined error code.
    pub code: i64,
    /// Human-readable message.
    pub message: String,
}

/// Result of a tool invocation, correlated back by `request_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCallResponse {
    /// Correlation id of the originating request.
    pub request_id: String,
    /// Result payload on success.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Error on rejection.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<CallError>,
}

impl ToolCallResponse {
    /// Create a success response.
    pub fn success(request_id: impl Into<String>, result: Value) -> Self {
        Self {
            request_id: request_id.into(),
            result: Some(result),
            error: None,
        }
    }

    /// Create a rejection response.
    pub fn rejected(request_id: impl Into<String>, code: i64, message: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            result: None,
            error: Some(CallError {
                code,
                message: message.into(),
            }),
        }
    }

    /// Whether the call succeeded.
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }
}

//! Wire types for the newline-delimited JSON RPC protocol.
//!
//! One JSON object per line in both directions. This side is a client
//! only; the service process implements the other end.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Method name for tool enumeration.
pub const METHOD_TOOLS_LIST: &str = "tools/list";
/// Method name for tool invocation.
pub const METHOD_TOOLS_CALL: &str = "tools/call";

/// Request frame.
#[derive(Debug, Serialize)]
pub struct RpcRequest {
    /// Per-connection correlation id.
    pub id: u64,
    /// "tools/list" or "tools/call".
    pub method: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

/// Response frame.
#[derive(Debug, Deserialize)]
pub struct RpcResponse {
    /// Correlation id; absent on malformed frames.
    pub id: Option<u64>,
    /// Result payload on success.
    pub result: Option<Value>,
    /// Error payload on rejection.
    pub error: Option<RpcError>,
}

/// Error payload within a response frame.
#[derive(Debug, Clone, Deserialize)]
pub struct RpcError {
    pub code: i64,
    pub message: String,
}

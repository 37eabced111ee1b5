use serde::{Deserialize, Serialize};

// =============================================================================
// Tool Types
// =============================================================================

/// A concrete tool named by the tool-need analyzer, independent of which
/// service provides it. Ordering within a list signals preference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolRequirement {
    /// Tool name as listed in the catalog.
    pub tool_name: String,
    /// Confidence in [0, 1] that this tool is what the query needs.
    pub confidence: f64,
}

impl ToolRequirement {
    /// Create a new requirement.
    pub fn new(tool_name: impl Into<String>, confidence: f64) -> Self {
        Self {
            tool_name: tool_name.into(),
            confidence: confidence.clamp(0.0, 1.0),
        }
    }
}

/// Tool definition at the registry boundary.
///
/// The registry itself is an external collaborator; the engine consumes a
/// live enumeration of these entries to prompt the analyzer and to validate
/// arguments before dispatch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Whether the tool is currently offered to analyzers.
    pub enabled: bool,

    /// JSON Schema for tool arguments.
    pub parameters: serde_json::Value,
}

impl ToolDefinition {
    /// Create an enabled tool definition with an empty schema.
    pub fn new(name: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: description.into(),
            enabled: true,
            parameters: serde_json::json!({ "type": "object" }),
        }
    }

    /// Set the parameter schema.
    pub fn with_parameters(mut self, parameters: serde_json::Value) -> Self {
        self.parameters = parameters;
        self
    }

    /// Mark the tool as disabled.
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }

    /// Required argument names from the parameter schema, if declared.
    pub fn required_arguments(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(|v| v.as_array())
            .map(|arr| arr.iter().filter_map(|v| v.as_str()).collect())
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_required_arguments() {
        let def = ToolDefinition::new("create_file", "Create a file").with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": { "path": { "type": "string" } },
                "required": ["path"]
            }),
        );
        assert_eq!(def.required_arguments(), vec!["path"]);

        let bare = ToolDefinition::new("echo", "Echo");
        assert!(bare.required_arguments().is_empty());
    }
}

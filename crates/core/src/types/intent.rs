use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// =============================================================================
// Intent Types (Router Output)
// =============================================================================

/// Closed set of intent categories a query can be routed to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntentKind {
    /// Conversational answer, no external action.
    NormalChat,
    /// Retrieval over the user's document corpus.
    KnowledgeSearch,
    /// External tool invocation through a service process.
    McpAction,
    /// Structured document production.
    DocumentGeneration,
}

impl IntentKind {
    /// Labels in routing priority order, highest first.
    pub const PRIORITY: [IntentKind; 4] = [
        IntentKind::DocumentGeneration,
        IntentKind::McpAction,
        IntentKind::KnowledgeSearch,
        IntentKind::NormalChat,
    ];

    /// Whether this intent routes through tool resolution and dispatch.
    pub fn requires_tools(&self) -> bool {
        matches!(self, IntentKind::McpAction | IntentKind::DocumentGeneration)
    }

    /// Wire label used in the classification contract.
    pub fn label(&self) -> &'static str {
        match self {
            IntentKind::NormalChat => "normal_chat",
            IntentKind::KnowledgeSearch => "knowledge_search",
            IntentKind::McpAction => "mcp_action",
            IntentKind::DocumentGeneration => "document_generation",
        }
    }

    /// Parse a wire label back into an intent kind.
    pub fn from_label(label: &str) -> Option<Self> {
        match label {
            "normal_chat" => Some(IntentKind::NormalChat),
            "knowledge_search" => Some(IntentKind::KnowledgeSearch),
            "mcp_action" => Some(IntentKind::McpAction),
            "document_generation" => Some(IntentKind::DocumentGeneration),
            _ => None,
        }
    }
}

impl std::fmt::Display for IntentKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// How a classification result was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AnalysisMethod {
    /// Produced by the language model classifier.
    Llm,
    /// Produced by the deterministic keyword fallback.
    Keyword,
}

/// Classification result. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntentResult {
    /// Classified intent.
    pub intent: IntentKind,
    /// Confidence in [0, 1].
    pub confidence: f64,
    /// Short explanation of why this intent was chosen.
    pub reasoning: String,
    /// Which analyzer produced the result.
    pub method: AnalysisMethod,
    /// Model identifier, present only for LLM results.
    pub model_used: Option<String>,
    /// When the result was produced.
    pub produced_at: DateTime<Utc>,
}

impl IntentResult {
    /// Create a result produced by the keyword fallback.
    pub fn keyword(intent: IntentKind, confidence: f64, reasoning: impl Into<String>) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            method: AnalysisMethod::Keyword,
            model_used: None,
            produced_at: Utc::now(),
        }
    }

    /// Create a result produced by the LLM classifier.
    pub fn llm(
        intent: IntentKind,
        confidence: f64,
        reasoning: impl Into<String>,
        model: impl Into<String>,
    ) -> Self {
        Self {
            intent,
            confidence: confidence.clamp(0.0, 1.0),
            reasoning: reasoning.into(),
            method: AnalysisMethod::Llm,
            model_used: Some(model.into()),
            produced_at: Utc::now(),
        }
    }
}

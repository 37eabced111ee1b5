//! LLM-first intent classification with a deterministic fallback.

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use switchboard_core::{
    traits::LlmClient,
    types::{IntentKind, IntentResult},
    Error, Result,
};

use crate::cache::AnalysisCache;
use crate::keyword::KeywordAnalyzer;

/// Fixed system instruction for the classification contract.
///
/// The priority ordering is explained to the model here; it is not enforced
/// in code. The response must be a single JSON object and nothing else.
const CLASSIFY_SYSTEM_PROMPT: &str = r#"You are an intent classifier for a document assistant.
Classify the user's message into exactly one of these intents:

- "document_generation": the user wants a structured document, report, or summary produced.
- "mcp_action": the user wants an external action performed, such as creating, modifying, deleting, or running files and commands.
- "knowledge_search": the user wants information retrieved from their uploaded documents or knowledge base.
- "normal_chat": everything else, including greetings, general questions, and questions about you.

If several intents seem to apply, prefer them in the order listed above; "normal_chat" is the safe default.

Respond with a single JSON object and nothing else:
{"intent_type": "<one of the four labels>", "confidence": <number between 0 and 1>, "reasoning": "<one short sentence>"}"#;

/// Shape the model must return. Anything else is a classification failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawClassification {
    intent_type: String,
    confidence: f64,
    reasoning: String,
}

/// Strip a single markdown code fence if the model wrapped its JSON in one.
pub(crate) fn strip_code_fences(content: &str) -> &str {
    let trimmed = content.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let rest = rest.strip_prefix("json").unwrap_or(rest);
        let rest = rest.trim_start_matches(['\r', '\n']);
        if let Some(inner) = rest.strip_suffix("```") {
            return inner.trim();
        }
    }
    trimmed
}

/// Intent classifier.
///
/// `classify` never surfaces an error: every failure mode of the model path
/// (transport, deadline, malformed response) lands in the keyword fallback,
/// tagged accordingly. A structurally valid model result is always accepted
/// as-is, even at low confidence; confidence gating happens downstream.
pub struct IntentClassifier {
    llm: Arc<dyn LlmClient>,
    fallback: KeywordAnalyzer,
    cache: Arc<AnalysisCache>,
    llm_timeout: Duration,
}

impl IntentClassifier {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        fallback: KeywordAnalyzer,
        cache: Arc<AnalysisCache>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            fallback,
            cache,
            llm_timeout,
        }
    }

    /// Classify a query. Total: always returns a result.
    pub async fn classify(&self, query: &str) -> IntentResult {
        if let Some(hit) = self.cache.get_intent(query) {
            tracing::debug!(intent = %hit.intent, "Classification cache hit");
            return hit;
        }

        match self.classify_llm(query).await {
            Ok(result) => {
                tracing::debug!(
                    intent = %result.intent,
                    confidence = result.confidence,
                    "LLM classification succeeded"
                );
                // Only model results are cached; the fallback is cheap and a
                // transient provider failure should not be pinned for a TTL.
                self.cache.put_intent(query, result.clone());
                result
            }
            Err(e) => {
                tracing::debug!(error = %e, "LLM classification failed, using keyword fallback");
                self.fallback.analyze(query)
            }
        }
    }

    async fn classify_llm(&self, query: &str) -> Result<IntentResult> {
        let completion = tokio::time::timeout(
            self.llm_timeout,
            self.llm.complete(CLASSIFY_SYSTEM_PROMPT, query),
        )
        .await
        .map_err(|_| Error::classification("classification call timed out"))??;

        let raw = parse_classification(&completion.content)?;
        let intent = IntentKind::from_label(&raw.intent_type).ok_or_else(|| {
            Error::classification(format!("unknown intent label '{}'", raw.intent_type))
        })?;

        Ok(IntentResult::llm(
            intent,
            raw.confidence,
            raw.reasoning,
            completion.model,
        ))
    }
}

fn parse_classification(content: &str) -> Result<RawClassification> {
    let body = strip_code_fences(content);
    let raw: RawClassification = serde_json::from_str(body)
        .map_err(|e| Error::classification(format!("malformed classification response: {}", e)))?;
    if !raw.confidence.is_finite() || !(0.0..=1.0).contains(&raw.confidence) {
        return Err(Error::classification(format!(
            "confidence {} outside [0, 1]",
            raw.confidence
        )));
    }
    Ok(raw)
}

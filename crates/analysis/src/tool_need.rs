//! Tool-need analysis: naming the concrete tools an action-intent requires.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;

use switchboard_core::{
    traits::{LlmClient, ToolCatalog},
    types::{IntentResult, ToolDefinition, ToolRequirement},
    Error, Result,
};

use crate::cache::AnalysisCache;
use crate::classifier::strip_code_fences;

/// Shape of one model pick. Anything else is an analysis failure.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawToolPick {
    tool_name: String,
    confidence: f64,
}

/// Synonym table bridging tool-name tokens to query vocabulary.
const TOKEN_SYNONYMS: &[(&str, &[&str])] = &[
    ("create", &["创建", "新建", "生成", "写入"]),
    ("write", &["写入", "写"]),
    ("read", &["读取", "查看", "打开"]),
    ("delete", &["删除", "移除"]),
    ("file", &["文件"]),
    ("folder", &["目录", "文件夹"]),
    ("directory", &["目录", "文件夹"]),
    ("search", &["搜索", "查找", "检索"]),
    ("list", &["列出", "列表", "清单"]),
    ("fetch", &["抓取", "获取"]),
    ("web", &["网页", "网站", "网址"]),
    ("run", &["运行", "执行"]),
];

/// Names the tools a classified action-intent needs.
///
/// The tool enumeration is requested live from the catalog collaborator so
/// newly registered tools are discoverable without a prompt change. An
/// empty result means "cannot act" and is not an error.
pub struct ToolNeedAnalyzer {
    llm: Arc<dyn LlmClient>,
    catalog: Arc<dyn ToolCatalog>,
    cache: Arc<AnalysisCache>,
    llm_timeout: Duration,
}

impl ToolNeedAnalyzer {
    pub fn new(
        llm: Arc<dyn LlmClient>,
        catalog: Arc<dyn ToolCatalog>,
        cache: Arc<AnalysisCache>,
        llm_timeout: Duration,
    ) -> Self {
        Self {
            llm,
            catalog,
            cache,
            llm_timeout,
        }
    }

    /// Resolve the tools a query needs. Total: failures yield an empty list
    /// or the keyword fallback, never an error.
    pub async fn resolve_tools(&self, query: &str, intent: &IntentResult) -> Vec<ToolRequirement> {
        if !intent.intent.requires_tools() {
            return Vec::new();
        }

        if let Some(hit) = self.cache.get_tools(query) {
            tracing::debug!(count = hit.len(), "Tool-need cache hit");
            return hit;
        }

        let tools: Vec<ToolDefinition> = match self.catalog.list_tools().await {
            Ok(tools) => tools.into_iter().filter(|t| t.enabled).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Tool catalog unavailable");
                return Vec::new();
            }
        };
        if tools.is_empty() {
            tracing::debug!("Tool catalog is empty, nothing to resolve against");
            return Vec::new();
        }

        match self.resolve_llm(query, &tools).await {
            Ok(requirements) => {
                self.cache.put_tools(query, requirements.clone());
                requirements
            }
            Err(e) => {
                tracing::debug!(error = %e, "LLM tool analysis failed, using keyword matching");
                keyword_match(query, &tools)
            }
        }
    }

    async fn resolve_llm(
        &self,
        query: &str,
        tools: &[ToolDefinition],
    ) -> Result<Vec<ToolRequirement>> {
        let system = build_tool_prompt(tools);
        let completion = tokio::time::timeout(
            self.llm_timeout,
            self.llm.complete(&system, query),
        )
        .await
        .map_err(|_| Error::tool_analysis("tool analysis call timed out"))??;

        let body = strip_code_fences(&completion.content);
        let picks: Vec<RawToolPick> = serde_json::from_str(body)
            .map_err(|e| Error::tool_analysis(format!("malformed tool response: {}", e)))?;

        let known: HashSet<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        let requirements = picks
            .into_iter()
            .filter(|pick| {
                let keep = known.contains(pick.tool_name.as_str());
                if !keep {
                    tracing::debug!(tool = %pick.tool_name, "Dropping tool not in catalog");
                }
                keep
            })
            .map(|pick| ToolRequirement::new(pick.tool_name, pick.confidence))
            .collect();
        Ok(requirements)
    }
}

/// System instruction enumerating the live tool catalog.
fn build_tool_prompt(tools: &[ToolDefinition]) -> String {
    let mut listing = String::new();
    for tool in tools {
        listing.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }
    format!(
        r#"You select tools for a user request. The available tools are:

{listing}
Respond with a JSON array and nothing else, most suitable tool first:
[{{"tool_name": "<name from the list>", "confidence": <number between 0 and 1>}}]

Respond with an empty array [] if no listed tool fits."#
    )
}

/// Deterministic fallback: score catalog entries by token and synonym hits.
fn keyword_match(query: &str, tools: &[ToolDefinition]) -> Vec<ToolRequirement> {
    let query_lower = query.to_lowercase();
    let mut scored: Vec<ToolRequirement> = Vec::new();

    for tool in tools {
        let mut hits = 0u32;

        for token in tool.name.to_lowercase().split(['_', '-', '/']) {
            if token.len() < 3 {
                continue;
            }
            if query_lower.contains(token) {
                hits += 1;
                continue;
            }
            let synonyms = TOKEN_SYNONYMS
                .iter()
                .find(|(key, _)| *key == token)
                .map(|(_, syns)| *syns)
                .unwrap_or(&[]);
            if synonyms.iter().any(|syn| query_lower.contains(syn)) {
                hits += 1;
            }
        }

        // A description word hit adds at most one signal.
        let description_hit = tool
            .description
            .to_lowercase()
            .split_whitespace()
            .filter(|word| word.len() >= 4)
            .any(|word| query_lower.contains(word));
        if description_hit {
            hits += 1;
        }

        if hits > 0 {
            let confidence = (0.4 + 0.15 * f64::from(hits)).min(0.9);
            scored.push(ToolRequirement::new(&tool.name, confidence));
        }
    }

    scored.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use switchboard_core::traits::LlmCompletion;
    use switchboard_core::types::IntentKind;

    struct StaticCatalog(Vec<ToolDefinition>);

    #[async_trait]
    impl ToolCatalog for StaticCatalog {
        async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
            Ok(self.0.clone())
        }

        async fn get(&self, name: &str) -> Result<Option<ToolDefinition>> {
            Ok(self.0.iter().find(|t| t.name == name).cloned())
        }
    }

    struct FixedLlm(Result<String>);

    #[async_trait]
    impl LlmClient for FixedLlm {
        async fn complete(&self, _system: &str, _user: &str) -> Result<LlmCompletion> {
            match &self.0 {
                Ok(content) => Ok(LlmCompletion {
                    content: content.clone(),
                    model: "mock-model".to_string(),
                }),
                Err(_) => Err(Error::model_provider("down")),
            }
        }

        fn model_name(&self) -> &str {
            "mock-model"
        }
    }

    fn file_tools() -> Vec<ToolDefinition> {
        vec![
            ToolDefinition::new("create_file", "Create a new file with given content"),
            ToolDefinition::new("delete_file", "Delete a file by path"),
            ToolDefinition::new("web_search", "Search the web for information"),
            ToolDefinition::new("hidden_tool", "Should never surface").disabled(),
        ]
    }

    fn analyzer(llm: FixedLlm, tools: Vec<ToolDefinition>) -> ToolNeedAnalyzer {
        ToolNeedAnalyzer::new(
            Arc::new(llm),
            Arc::new(StaticCatalog(tools)),
            Arc::new(AnalysisCache::new(Duration::from_secs(60), 16)),
            Duration::from_millis(100),
        )
    }

    fn action_intent() -> IntentResult {
        IntentResult::keyword(IntentKind::McpAction, 0.8, "test")
    }

    #[tokio::test]
    async fn test_non_action_intent_yields_nothing() {
        let analyzer = analyzer(
            FixedLlm(Ok(r#"[{"tool_name": "create_file", "confidence": 0.9}]"#.into())),
            file_tools(),
        );
        let chat = IntentResult::keyword(IntentKind::NormalChat, 0.6, "test");
        let result = analyzer.resolve_tools("你好", &chat).await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_llm_picks_are_filtered_by_catalog() {
        let analyzer = analyzer(
            FixedLlm(Ok(r#"[
                {"tool_name": "create_file", "confidence": 0.9},
                {"tool_name": "made_up_tool", "confidence": 0.8}
            ]"#
            .into())),
            file_tools(),
        );
        let result = analyzer
            .resolve_tools("创建一个README.md文件", &action_intent())
            .await;
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].tool_name, "create_file");
    }

    #[tokio::test]
    async fn test_llm_failure_uses_keyword_matching() {
        let analyzer = analyzer(FixedLlm(Err(Error::model_provider("down"))), file_tools());
        let result = analyzer
            .resolve_tools("创建一个README.md文件", &action_intent())
            .await;
        assert!(!result.is_empty());
        assert_eq!(result[0].tool_name, "create_file");
    }

    #[tokio::test]
    async fn test_no_match_is_empty_not_error() {
        let analyzer = analyzer(FixedLlm(Ok("[]".into())), file_tools());
        let result = analyzer
            .resolve_tools("做一件完全无关的事", &action_intent())
            .await;
        assert!(result.is_empty());
    }

    #[tokio::test]
    async fn test_empty_catalog_yields_nothing() {
        let analyzer = analyzer(
            FixedLlm(Ok(r#"[{"tool_name": "create_file", "confidence": 0.9}]"#.into())),
            Vec::new(),
        );
        let result = analyzer
            .resolve_tools("创建一个README.md文件", &action_intent())
            .await;
        assert!(result.is_empty());
    }

    #[test]
    fn test_keyword_match_scores_synonyms() {
        let tools: Vec<ToolDefinition> = file_tools()
            .into_iter()
            .filter(|t| t.enabled)
            .collect();
        let result = keyword_match("创建一个README.md文件", &tools);
        assert_eq!(result[0].tool_name, "create_file");
        assert!(result[0].confidence > 0.5);
    }

    #[test]
    fn test_prompt_lists_tools() {
        let prompt = build_tool_prompt(&file_tools());
        assert!(prompt.contains("create_file"));
        assert!(prompt.contains("web_search"));
    }
}

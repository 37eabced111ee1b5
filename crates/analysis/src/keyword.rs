//! Deterministic keyword fallback analysis.
//!
//! A weighted keyword/regex matcher over a fixed rule table. Pure and
//! total: every query produces a result, with `normal_chat` as the
//! universal fallback when nothing else clears its threshold.

use regex::Regex;

use switchboard_core::{
    types::{IntentKind, IntentResult},
    Error, Result,
};

/// Regex context pattern with a signed score adjustment.
#[derive(Debug)]
struct ContextPattern {
    pattern: Regex,
    boost: f64,
}

/// Scoring rule for one intent label.
#[derive(Debug)]
pub struct IntentRule {
    intent: IntentKind,
    /// Terms counted at full weight.
    primary_terms: Vec<String>,
    /// Weaker contextual terms.
    secondary_terms: Vec<String>,
    patterns: Vec<ContextPattern>,
    primary_weight: f64,
    secondary_weight: f64,
    /// Score a query must reach for this rule to claim it.
    score_threshold: f64,
    /// Confidence floor reported when the rule wins.
    confidence_base: f64,
}

impl IntentRule {
    /// Build a rule; pattern strings are compiled here.
    pub fn new(
        intent: IntentKind,
        primary_terms: &[&str],
        secondary_terms: &[&str],
        patterns: &[(&str, f64)],
        score_threshold: f64,
        confidence_base: f64,
    ) -> Result<Self> {
        let compiled = patterns
            .iter()
            .map(|(source, boost)| {
                Regex::new(source)
                    .map(|pattern| ContextPattern {
                        pattern,
                        boost: *boost,
                    })
                    .map_err(|e| Error::config(format!("bad context pattern '{}': {}", source, e)))
            })
            .collect::<Result<Vec<_>>>()?;

        let rule = Self {
            intent,
            primary_terms: primary_terms.iter().map(|t| t.to_lowercase()).collect(),
            secondary_terms: secondary_terms.iter().map(|t| t.to_lowercase()).collect(),
            patterns: compiled,
            primary_weight: 1.0,
            secondary_weight: 0.4,
            score_threshold,
            confidence_base,
        };
        rule.validate()?;
        Ok(rule)
    }

    fn validate(&self) -> Result<()> {
        if self.primary_terms.is_empty() && self.patterns.is_empty() {
            return Err(Error::config(format!(
                "rule for '{}' has no primary terms and no patterns",
                self.intent
            )));
        }
        if self.score_threshold <= 0.0 {
            return Err(Error::config(format!(
                "rule for '{}' has a non-positive threshold",
                self.intent
            )));
        }
        if !(0.0..=1.0).contains(&self.confidence_base) {
            return Err(Error::config(format!(
                "rule for '{}' has confidence base outside [0, 1]",
                self.intent
            )));
        }
        Ok(())
    }

    /// Weighted score plus the number of positive signals that fired.
    fn evaluate(&self, query: &str, query_lower: &str) -> (f64, u32) {
        let mut score = 0.0;
        let mut hits = 0u32;

        for term in &self.primary_terms {
            if query_lower.contains(term.as_str()) {
                score += self.primary_weight;
                hits += 1;
            }
        }
        for term in &self.secondary_terms {
            if query_lower.contains(term.as_str()) {
                score += self.secondary_weight;
                hits += 1;
            }
        }
        for ctx in &self.patterns {
            if ctx.pattern.is_match(query) {
                score += ctx.boost;
                if ctx.boost > 0.0 {
                    hits += 1;
                }
            }
        }

        (score, hits)
    }
}

/// Identity questions ("who are you") read like knowledge lookups but are
/// plain conversation; the pattern swings the score both ways.
const IDENTITY_PATTERN: &str =
    r"(?i)(你是谁|你叫什么|你能做什么|who are you|what are you|what can you do|introduce yourself)";

const FILE_EXTENSIONS: &str = r"\.(md|txt|py|rs|js|ts|json|yaml|yml|toml|csv|html)([^a-z0-9]|$)";

/// Deterministic keyword analyzer over an ordered rule table.
///
/// Rules are scanned in fixed priority order; the first rule whose score
/// clears its own threshold wins, regardless of how later rules would have
/// scored. This is deliberately not an argmax.
pub struct KeywordAnalyzer {
    rules: Vec<IntentRule>,
    default_confidence: f64,
}

impl KeywordAnalyzer {
    /// Build the analyzer with the compiled-in default ruleset.
    pub fn new(default_confidence: f64) -> Result<Self> {
        Self::with_rules(Self::default_rules()?, default_confidence)
    }

    /// Build the analyzer from an explicit rule table.
    ///
    /// The table order is the priority order. Fails fast on an empty table
    /// so a misloaded ruleset cannot silently classify everything as chat.
    pub fn with_rules(rules: Vec<IntentRule>, default_confidence: f64) -> Result<Self> {
        if rules.is_empty() {
            return Err(Error::config("keyword rule table is empty"));
        }
        Ok(Self {
            rules,
            default_confidence,
        })
    }

    /// Classify a query. Total: always returns a result.
    pub fn analyze(&self, query: &str) -> IntentResult {
        let query_lower = query.to_lowercase();

        for rule in &self.rules {
            let (score, hits) = rule.evaluate(query, &query_lower);
            if score >= rule.score_threshold {
                let confidence =
                    (rule.confidence_base + 0.03 * f64::from(hits.saturating_sub(1))).min(0.95);
                tracing::debug!(
                    intent = %rule.intent,
                    score,
                    hits,
                    "Keyword rule matched"
                );
                return IntentResult::keyword(
                    rule.intent,
                    confidence,
                    format!("matched {} keyword signal(s) for {}", hits, rule.intent),
                );
            }
        }

        IntentResult::keyword(
            IntentKind::NormalChat,
            self.default_confidence,
            "no keyword rule cleared its threshold; defaulting to chat",
        )
    }

    /// The compiled-in ruleset, in priority order.
    fn default_rules() -> Result<Vec<IntentRule>> {
        let creation_pattern = format!(
            r"(?i)(创建|新建|生成|写入|create|make|add|write)[^\n]{{0,40}}{}",
            FILE_EXTENSIONS
        );
        let extension_pattern = format!(r"(?i){}", FILE_EXTENSIONS);

        Ok(vec![
            IntentRule::new(
                IntentKind::DocumentGeneration,
                &[
                    "生成报告",
                    "写一份",
                    "写一篇",
                    "生成文档",
                    "生成一份",
                    "帮我写",
                    "写报告",
                    "写总结",
                    "write a report",
                    "draft a",
                    "generate a document",
                    "generate a report",
                    "compose a",
                ],
                &[
                    "报告", "文档", "总结", "大纲", "文章", "report", "document", "summary",
                    "essay", "outline",
                ],
                &[(
                    r"(?i)(写|生成|draft|write|compose)[^\n]{0,20}(报告|文档|总结|大纲|report|document|summary|outline)",
                    1.5,
                )],
                1.0,
                0.78,
            )?,
            IntentRule::new(
                IntentKind::McpAction,
                &[
                    "创建",
                    "新建",
                    "删除",
                    "执行",
                    "运行",
                    "安装",
                    "重命名",
                    "create",
                    "delete",
                    "execute",
                    "install",
                    "rename",
                    "run the",
                ],
                &[
                    "文件", "目录", "文件夹", "脚本", "命令", "file", "folder", "directory",
                    "script", "command",
                ],
                &[
                    // Creation verb followed by a concrete file name.
                    (creation_pattern.as_str(), 2.0),
                    (extension_pattern.as_str(), 0.5),
                ],
                1.0,
                0.75,
            )?,
            IntentRule::new(
                IntentKind::KnowledgeSearch,
                &[
                    "搜索文档",
                    "检索",
                    "查找资料",
                    "在文档中",
                    "从文档",
                    "知识库",
                    "文档里",
                    "search the documents",
                    "search my documents",
                    "find in my notes",
                    "look up in the docs",
                ],
                &[
                    "文档",
                    "资料",
                    "笔记",
                    "上传",
                    "documents",
                    "notes",
                    "uploaded",
                    "knowledge base",
                ],
                &[
                    (IDENTITY_PATTERN, -3.0),
                    (r"(?i)(search|find|查找|搜索|检索)", 0.3),
                ],
                1.0,
                0.72,
            )?,
            IntentRule::new(
                IntentKind::NormalChat,
                &[
                    "你好",
                    "您好",
                    "谢谢",
                    "早上好",
                    "晚上好",
                    "hello",
                    "hi there",
                    "thanks",
                    "thank you",
                    "good morning",
                ],
                &[
                    "聊聊",
                    "介绍一下",
                    "explain",
                    "为什么",
                    "什么是",
                    "how do",
                    "why",
                    "tell me about",
                ],
                &[(IDENTITY_PATTERN, 2.0)],
                0.8,
                0.6,
            )?,
        ])
    }
}

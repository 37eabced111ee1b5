//! Query analysis for Switchboard.
//!
//! Classifies free-text queries into intents (LLM-first with a
//! deterministic keyword fallback), names the concrete tools an
//! action-intent needs, and memoizes both through a TTL-bounded cache.

pub mod cache;
pub mod classifier;
pub mod keyword;
pub mod tool_need;

pub use cache::{AnalysisCache, CacheStats};
pub use classifier::IntentClassifier;
pub use keyword::{IntentRule, KeywordAnalyzer};
pub use tool_need::ToolNeedAnalyzer;

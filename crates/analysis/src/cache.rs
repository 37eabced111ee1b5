//! Memo cache for analysis results.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use switchboard_core::types::{IntentResult, ToolRequirement};

/// Cache entry with expiration.
#[derive(Debug, Clone)]
struct CacheEntry<T> {
    value: T,
    created_at: Instant,
    ttl: Duration,
    hit_count: u64,
}

impl<T> CacheEntry<T> {
    fn is_expired(&self) -> bool {
        self.created_at.elapsed() > self.ttl
    }
}

/// TTL + capacity bounded map.
///
/// On insert at capacity, expired entries go first; if the map is still
/// full, the oldest entry is evicted.
struct TtlStore<T: Clone> {
    entries: DashMap<String, CacheEntry<T>>,
    ttl: Duration,
    capacity: usize,
}

impl<T: Clone> TtlStore<T> {
    fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
            capacity: capacity.max(1),
        }
    }

    fn get(&self, key: &str) -> Option<T> {
        let expired = match self.entries.get_mut(key) {
            Some(mut entry) => {
                if !entry.is_expired() {
                    entry.hit_count += 1;
                    return Some(entry.value.clone());
                }
                true
            }
            None => false,
        };
        if expired {
            self.entries.remove(key);
        }
        None
    }

    fn insert(&self, key: String, value: T) {
        if self.entries.len() >= self.capacity {
            self.entries.retain(|_, v| !v.is_expired());
        }
        if self.entries.len() >= self.capacity {
            let oldest = self
                .entries
                .iter()
                .min_by_key(|e| e.value().created_at)
                .map(|e| e.key().clone());
            if let Some(key) = oldest {
                self.entries.remove(&key);
            }
        }
        self.entries.insert(
            key,
            CacheEntry {
                value,
                created_at: Instant::now(),
                ttl: self.ttl,
                hit_count: 0,
            },
        );
    }

    fn clear(&self) {
        self.entries.clear();
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn total_hits(&self) -> u64 {
        self.entries.iter().map(|e| e.hit_count).sum()
    }
}

/// Cache statistics.
#[derive(Debug, Clone)]
pub struct CacheStats {
    /// Cached intent classifications.
    pub intent_entries: usize,
    /// Cached tool requirement lists.
    pub tool_entries: usize,
    /// Hits across both stores.
    pub total_hits: u64,
}

/// Shared memo store for the intent classifier and the tool-need analyzer.
///
/// Keys are normalized query text so trivially different spellings of the
/// same query do not trigger redundant LLM calls.
pub struct AnalysisCache {
    intents: TtlStore<IntentResult>,
    tools: TtlStore<Vec<ToolRequirement>>,
}

impl AnalysisCache {
    /// Create a cache with the given entry lifetime and per-store capacity.
    pub fn new(ttl: Duration, capacity: usize) -> Self {
        Self {
            intents: TtlStore::new(ttl, capacity),
            tools: TtlStore::new(ttl, capacity),
        }
    }

    /// Normalize a query for caching.
    pub fn normalize(query: &str) -> String {
        query
            .to_lowercase()
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Look up a cached classification.
    pub fn get_intent(&self, query: &str) -> Option<IntentResult> {
        self.intents.get(&Self::normalize(query))
    }

    /// Store a classification.
    pub fn put_intent(&self, query: &str, result: IntentResult) {
        self.intents.insert(Self::normalize(query), result);
    }

    /// Look up cached tool requirements.
    pub fn get_tools(&self, query: &str) -> Option<Vec<ToolRequirement>> {
        self.tools.get(&Self::normalize(query))
    }

    /// Store tool requirements.
    pub fn put_tools(&self, query: &str, requirements: Vec<ToolRequirement>) {
        self.tools.insert(Self::normalize(query), requirements);
    }

    /// Drop every entry in both stores.
    pub fn clear(&self) {
        self.intents.clear();
        self.tools.clear();
    }

    /// Current cache statistics.
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            intent_entries: self.intents.len(),
            tool_entries: self.tools.len(),
            total_hits: self.intents.total_hits() + self.tools.total_hits(),
        }
    }
}

//! Built-in static tool catalog.

use async_trait::async_trait;
use dashmap::DashMap;

use switchboard_core::{traits::ToolCatalog, types::ToolDefinition, Result};

/// Configuration-fed `ToolCatalog` implementation.
///
/// The real registry is an external collaborator; this static variant backs
/// the binary and the test suite with the same boundary shape.
pub struct StaticCatalog {
    tools: DashMap<String, ToolDefinition>,
}

impl StaticCatalog {
    /// Create an empty catalog.
    pub fn new() -> Self {
        Self {
            tools: DashMap::new(),
        }
    }

    /// Create a catalog from definitions.
    pub fn from_definitions(definitions: Vec<ToolDefinition>) -> Self {
        let catalog = Self::new();
        for def in definitions {
            catalog.register(def);
        }
        catalog
    }

    /// Register or replace a tool definition.
    pub fn register(&self, definition: ToolDefinition) {
        tracing::debug!(tool = %definition.name, "Registering catalog tool");
        self.tools.insert(definition.name.clone(), definition);
    }

    /// Number of registered tools.
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

impl Default for StaticCatalog {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolCatalog for StaticCatalog {
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>> {
        let mut tools: Vec<ToolDefinition> =
            self.tools.iter().map(|e| e.value().clone()).collect();
        // Deterministic order keeps analyzer prompts stable.
        tools.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(tools)
    }

    async fn get(&self, name: &str) -> Result<Option<ToolDefinition>> {
        Ok(self.tools.get(name).map(|e| e.value().clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_register_and_list() {
        let catalog = StaticCatalog::new();
        catalog.register(ToolDefinition::new("web_search", "Search the web"));
        catalog.register(ToolDefinition::new("create_file", "Create a file"));

        let tools = catalog.list_tools().await.unwrap();
        assert_eq!(tools.len(), 2);
        // Sorted by name.
        assert_eq!(tools[0].name, "create_file");
    }

    #[tokio::test]
    async fn test_get() {
        let catalog =
            StaticCatalog::from_definitions(vec![ToolDefinition::new("create_file", "Create")]);
        assert!(catalog.get("create_file").await.unwrap().is_some());
        assert!(catalog.get("missing").await.unwrap().is_none());
    }
}

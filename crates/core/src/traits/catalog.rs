//! Tool-registry boundary traits.

use async_trait::async_trait;

use crate::error::Result;
use crate::types::ToolDefinition;

/// Live enumeration of the tools known to the external registry.
///
/// The registry itself lives outside this engine. The enumeration is
/// requested fresh when building analyzer prompts, so newly added tools are
/// discoverable without a template change.
#[async_trait]
pub trait ToolCatalog: Send + Sync {
    /// List all tool definitions, including disabled ones.
    async fn list_tools(&self) -> Result<Vec<ToolDefinition>>;

    /// Look up a single tool by name.
    async fn get(&self, name: &str) -> Result<Option<ToolDefinition>>;
}

//! Tool to service resolution.

use std::sync::Arc;

use switchboard_core::{types::ServiceDescriptor, Error, Result};

use crate::table::ServiceTableHandle;

/// Resolves a tool name to the service that should execute it.
///
/// Candidates are tried in their configured order; the first enabled one
/// wins. "Every candidate was disabled" and "nothing maps this tool" are
/// distinct failures so the caller can suggest enabling a service rather
/// than claiming the capability does not exist.
pub struct ServiceResolver {
    table: Arc<ServiceTableHandle>,
}

impl ServiceResolver {
    pub fn new(table: Arc<ServiceTableHandle>) -> Self {
        Self { table }
    }

    /// Resolve the service for a tool.
    pub async fn resolve(&self, tool_name: &str) -> Result<ServiceDescriptor> {
        let table = self.table.snapshot().await;

        let candidates = table
            .candidates(tool_name)
            .ok_or_else(|| Error::ToolUnmapped(tool_name.to_string()))?;

        let mut disabled: Vec<String> = Vec::new();
        for id in candidates {
            match table.service(id) {
                None => {
                    tracing::debug!(
                        tool = %tool_name,
                        service = %id,
                        "Candidate not present in configuration, skipping"
                    );
                }
                Some(service) if !service.enabled => {
                    disabled.push(id.clone());
                }
                Some(service) => {
                    tracing::debug!(tool = %tool_name, service = %id, "Resolved tool to service");
                    return Ok(service.clone());
                }
            }
        }

        if disabled.is_empty() {
            Err(Error::ToolUnmapped(tool_name.to_string()))
        } else {
            Err(Error::ServiceDisabled {
                tool: tool_name.to_string(),
                candidates: disabled,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::table::ServiceTable;
    use std::collections::HashMap;
    use switchboard_core::types::ServiceKind;

    fn descriptor(id: &str, enabled: bool) -> ServiceDescriptor {
        ServiceDescriptor {
            service_id: id.to_string(),
            kind: ServiceKind::NativeBinary,
            command: "echo".to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            enabled,
            timeout_secs: 5,
            working_directory: None,
            package: None,
        }
    }

    fn resolver(
        services: HashMap<String, ServiceDescriptor>,
        tools: HashMap<String, Vec<String>>,
    ) -> ServiceResolver {
        let table = ServiceTable::new(services, tools).unwrap();
        ServiceResolver::new(Arc::new(ServiceTableHandle::new(table)))
    }

    #[tokio::test]
    async fn test_first_enabled_wins() {
        let resolver = resolver(
            HashMap::from([
                ("off".to_string(), descriptor("off", false)),
                ("on".to_string(), descriptor("on", true)),
                ("also-on".to_string(), descriptor("also-on", true)),
            ]),
            HashMap::from([(
                "create_file".to_string(),
                vec!["off".to_string(), "on".to_string(), "also-on".to_string()],
            )]),
        );

        let service = resolver.resolve("create_file").await.unwrap();
        assert_eq!(service.service_id, "on");
    }

    #[tokio::test]
    async fn test_all_disabled_is_disabled_not_unmapped() {
        let resolver = resolver(
            HashMap::from([("off".to_string(), descriptor("off", false))]),
            HashMap::from([("create_file".to_string(), vec!["off".to_string()])]),
        );

        match resolver.resolve("create_file").await {
            Err(Error::ServiceDisabled { tool, candidates }) => {
                assert_eq!(tool, "create_file");
                assert_eq!(candidates, vec!["off".to_string()]);
            }
            other => panic!("expected ServiceDisabled, got {:?}", other.map(|s| s.service_id)),
        }
    }

    #[tokio::test]
    async fn test_unmapped_tool_is_unmapped_not_disabled() {
        let resolver = resolver(
            HashMap::from([("off".to_string(), descriptor("off", false))]),
            HashMap::new(),
        );

        match resolver.resolve("teleport").await {
            Err(Error::ToolUnmapped(tool)) => assert_eq!(tool, "teleport"),
            other => panic!("expected ToolUnmapped, got {:?}", other.map(|s| s.service_id)),
        }
    }

    #[tokio::test]
    async fn test_missing_candidates_are_skipped() {
        let resolver = resolver(
            HashMap::from([("real".to_string(), descriptor("real", true))]),
            HashMap::from([(
                "create_file".to_string(),
                vec!["ghost".to_string(), "real".to_string()],
            )]),
        );

        let service = resolver.resolve("create_file").await.unwrap();
        assert_eq!(service.service_id, "real");
    }

    #[tokio::test]
    async fn test_only_missing_candidates_is_unmapped() {
        let resolver = resolver(
            HashMap::new(),
            HashMap::from([("create_file".to_string(), vec!["ghost".to_string()])]),
        );

        assert!(matches!(
            resolver.resolve("create_file").await,
            Err(Error::ToolUnmapped(_))
        ));
    }
}

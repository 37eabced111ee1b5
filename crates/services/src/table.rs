//! Service configuration table with atomic reload.

use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use switchboard_core::{config::AppConfig, types::ServiceDescriptor, Error, Result};

/// Immutable snapshot of the service configuration.
///
/// Built once from configuration and validated up front. A reload produces
/// a fresh snapshot and swaps it in wholesale, so a request that already
/// holds a snapshot keeps reading consistent data.
#[derive(Debug, Clone)]
pub struct ServiceTable {
    services: HashMap<String, ServiceDescriptor>,
    tool_map: HashMap<String, Vec<String>>,
}

impl ServiceTable {
    /// Build and validate a snapshot.
    ///
    /// Structurally broken entries (empty command, zero timeout) fail fast.
    /// Tool mappings pointing at unknown service ids are kept but warned
    /// about; the resolver skips them at lookup time.
    pub fn new(
        services: HashMap<String, ServiceDescriptor>,
        tool_map: HashMap<String, Vec<String>>,
    ) -> Result<Self> {
        for (id, service) in &services {
            if service.command.trim().is_empty() {
                return Err(Error::config(format!("service '{}' has an empty command", id)));
            }
            if service.timeout_secs == 0 {
                return Err(Error::config(format!("service '{}' has a zero timeout", id)));
            }
        }
        for (tool, candidates) in &tool_map {
            for id in candidates {
                if !services.contains_key(id) {
                    tracing::warn!(
                        tool = %tool,
                        service = %id,
                        "Tool mapping references an unknown service"
                    );
                }
            }
        }
        Ok(Self { services, tool_map })
    }

    /// Build a snapshot from the application configuration.
    pub fn from_config(config: &AppConfig) -> Result<Self> {
        Self::new(config.service_descriptors(), config.tools.clone())
    }

    /// Look up a service by id.
    pub fn service(&self, id: &str) -> Option<&ServiceDescriptor> {
        self.services.get(id)
    }

    /// Candidate service ids for a tool, in preference order.
    pub fn candidates(&self, tool: &str) -> Option<&[String]> {
        self.tool_map.get(tool).map(Vec::as_slice)
    }

    /// Number of configured services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// Whether any service is configured.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }
}

/// Shared handle over the current table snapshot.
///
/// Readers clone the `Arc` and never observe a half-updated table; a reload
/// swaps the single reference.
pub struct ServiceTableHandle {
    inner: RwLock<Arc<ServiceTable>>,
}

impl ServiceTableHandle {
    /// Wrap an initial snapshot.
    pub fn new(table: ServiceTable) -> Self {
        Self {
            inner: RwLock::new(Arc::new(table)),
        }
    }

    /// Current snapshot.
    pub async fn snapshot(&self) -> Arc<ServiceTable> {
        self.inner.read().await.clone()
    }

    /// Atomically replace the table.
    pub async fn reload(&self, table: ServiceTable) {
        let mut guard = self.inner.write().await;
        tracing::info!(services = table.len(), "Reloading service table");
        *guard = Arc::new(table);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
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

    #[test]
    fn test_empty_command_rejected() {
        let mut svc = descriptor("bad", true);
        svc.command = "  ".to_string();
        let result = ServiceTable::new(
            HashMap::from([("bad".to_string(), svc)]),
            HashMap::new(),
        );
        assert!(result.is_err());
    }

    #[test]
    fn test_zero_timeout_rejected() {
        let mut svc = descriptor("bad", true);
        svc.timeout_secs = 0;
        let result = ServiceTable::new(
            HashMap::from([("bad".to_string(), svc)]),
            HashMap::new(),
        );
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn test_reload_swaps_wholesale() {
        let first = ServiceTable::new(
            HashMap::from([("a".to_string(), descriptor("a", true))]),
            HashMap::new(),
        )
        .unwrap();
        let handle = ServiceTableHandle::new(first);

        let held = handle.snapshot().await;

        let second = ServiceTable::new(
            HashMap::from([("b".to_string(), descriptor("b", true))]),
            HashMap::new(),
        )
        .unwrap();
        handle.reload(second).await;

        // The held snapshot still sees the old world.
        assert!(held.service("a").is_some());
        assert!(held.service("b").is_none());

        let fresh = handle.snapshot().await;
        assert!(fresh.service("a").is_none());
        assert!(fresh.service("b").is_some());
    }
}

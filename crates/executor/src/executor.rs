//! Tool executor: dispatch, retry, and the global concurrency ceiling.

use dashmap::DashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;

use switchboard_core::{
    config::ExecutorConfig,
    types::{ServiceDescriptor, ToolCallRequest, ToolCallResponse},
    Error, Result,
};

use crate::connection::ServiceConnection;
use crate::rpc::{RpcResponse, METHOD_TOOLS_CALL, METHOD_TOOLS_LIST};

/// Executor counters for diagnostics.
#[derive(Debug, Clone)]
pub struct ExecutorStats {
    /// Concurrency permits currently free.
    pub available_permits: usize,
    /// Connections held, in any state.
    pub connections: usize,
}

/// Dispatches tool calls to service subprocesses.
///
/// One connection per service id, replaced only from the `Failed` state.
/// Every call holds a permit from a global semaphore, so the number of
/// simultaneous in-flight round-trips across all services never exceeds
/// the configured ceiling; excess calls queue on the semaphore.
pub struct ToolExecutor {
    connections: DashMap<String, Arc<ServiceConnection>>,
    permits: Arc<Semaphore>,
    max_concurrent: usize,
    retry_attempts: u32,
    retry_delay: Duration,
}

impl ToolExecutor {
    pub fn new(max_concurrent: usize, retry_attempts: u32, retry_delay: Duration) -> Self {
        let max_concurrent = max_concurrent.max(1);
        Self {
            connections: DashMap::new(),
            permits: Arc::new(Semaphore::new(max_concurrent)),
            max_concurrent,
            retry_attempts: retry_attempts.max(1),
            retry_delay,
        }
    }

    /// Build from the application config section.
    pub fn from_config(config: &ExecutorConfig) -> Self {
        Self::new(
            config.max_concurrent_calls,
            config.retry_attempts,
            Duration::from_millis(config.retry_delay_ms),
        )
    }

    /// Invoke one tool on its resolved service.
    ///
    /// Deadline and transport failures are retried up to the attempt count
    /// with a fixed inter-attempt delay. A rejection from the service is an
    /// application-level answer: it is returned as a response, never
    /// retried. The caller must already have checked the installation
    /// precondition; a disabled descriptor must never reach this point.
    pub async fn call(
        &self,
        service: &ServiceDescriptor,
        request: &ToolCallRequest,
    ) -> Result<ToolCallResponse> {
        debug_assert!(service.enabled, "disabled service reached the executor");

        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::internal("executor semaphore closed"))?;

        let params = serde_json::json!({
            "name": request.tool_name,
            "arguments": request.arguments,
        });

        let mut attempt = 0u32;
        loop {
            attempt += 1;
            match self.round_trip(service, METHOD_TOOLS_CALL, Some(params.clone())).await {
                Ok(response) => {
                    return Ok(match response.error {
                        Some(err) => {
                            tracing::debug!(
                                service = %service.service_id,
                                tool = %request.tool_name,
                                code = err.code,
                                "Service rejected tool call"
                            );
                            ToolCallResponse::rejected(&request.request_id, err.code, err.message)
                        }
                        None => ToolCallResponse::success(
                            &request.request_id,
                            response.result.unwrap_or(serde_json::Value::Null),
                        ),
                    });
                }
                Err(e) if e.is_retryable() && attempt < self.retry_attempts => {
                    tracing::warn!(
                        service = %service.service_id,
                        tool = %request.tool_name,
                        attempt,
                        error = %e,
                        "Tool call failed, retrying"
                    );
                    tokio::time::sleep(self.retry_delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Fan out several calls concurrently, bounded by the global ceiling.
    ///
    /// All calls run to completion; one failure never cancels its siblings.
    pub async fn call_many(
        &self,
        calls: &[(ServiceDescriptor, ToolCallRequest)],
    ) -> Vec<Result<ToolCallResponse>> {
        futures::future::join_all(
            calls
                .iter()
                .map(|(service, request)| self.call(service, request)),
        )
        .await
    }

    /// Ask a service for its tool listing.
    pub async fn list_remote_tools(
        &self,
        service: &ServiceDescriptor,
    ) -> Result<serde_json::Value> {
        let _permit = self
            .permits
            .acquire()
            .await
            .map_err(|_| Error::internal("executor semaphore closed"))?;

        let response = self.round_trip(service, METHOD_TOOLS_LIST, None).await?;
        match response.error {
            Some(err) => Err(Error::ExecutionRejected {
                code: err.code,
                message: err.message,
            }),
            None => Ok(response.result.unwrap_or(serde_json::Value::Null)),
        }
    }

    /// Close every held connection and reap the children.
    pub async fn shutdown_all(&self) {
        let held: Vec<Arc<ServiceConnection>> = self
            .connections
            .iter()
            .map(|e| e.value().clone())
            .collect();
        self.connections.clear();
        for conn in held {
            conn.close().await;
        }
    }

    /// Current executor counters.
    pub fn stats(&self) -> ExecutorStats {
        ExecutorStats {
            available_permits: self.permits.available_permits(),
            connections: self.connections.len(),
        }
    }

    /// The configured concurrency ceiling.
    pub fn ceiling(&self) -> usize {
        self.max_concurrent
    }

    async fn round_trip(
        &self,
        service: &ServiceDescriptor,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<RpcResponse> {
        let conn = self.connection_for(service).await?;
        conn.request(method, params, service.timeout()).await
    }

    /// Reuse the live connection for a service, or replace a broken one.
    /// A connection that reached `Failed` is discarded, never written to.
    async fn connection_for(&self, service: &ServiceDescriptor) -> Result<Arc<ServiceConnection>> {
        if let Some(existing) = self.connections.get(&service.service_id) {
            if existing.usable() {
                return Ok(existing.clone());
            }
        }
        self.connections.remove(&service.service_id);

        let conn = ServiceConnection::spawn(service).await?;
        self.connections
            .insert(service.service_id.clone(), conn.clone());
        Ok(conn)
    }
}

//! Query engine: classify, resolve, verify, dispatch, fan in.

use std::sync::Arc;
use std::time::Duration;

use futures::future::join_all;

use switchboard_analysis::{IntentClassifier, ToolNeedAnalyzer};
use switchboard_core::{
    traits::ToolCatalog,
    types::{
        OutcomeError, OutcomeErrorKind, QueryOutcome, ToolCallRequest, ToolRequirement,
    },
    Error,
};
use switchboard_executor::ToolExecutor;
use switchboard_services::{InstallationManager, ServiceResolver, ServiceTable, ServiceTableHandle};

/// Result of one fanned-out tool dispatch.
struct SubResult {
    response: Option<switchboard_core::types::ToolCallResponse>,
    error: Option<OutcomeError>,
}

impl SubResult {
    fn failed(error: OutcomeError) -> Self {
        Self {
            response: None,
            error: Some(error),
        }
    }
}

/// The routing-and-dispatch engine.
///
/// Handles one query end to end: classification (never failing), tool-need
/// analysis for action intents, service resolution, installation
/// verification, and concurrent dispatch. Every failure lands in the
/// outcome as a typed error; nothing here is fatal to the host process.
pub struct QueryEngine {
    classifier: IntentClassifier,
    tool_need: ToolNeedAnalyzer,
    resolver: ServiceResolver,
    installer: Arc<InstallationManager>,
    executor: Arc<ToolExecutor>,
    catalog: Arc<dyn ToolCatalog>,
    table: Arc<ServiceTableHandle>,
    pipeline_timeout: Duration,
}

impl QueryEngine {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        classifier: IntentClassifier,
        tool_need: ToolNeedAnalyzer,
        resolver: ServiceResolver,
        installer: Arc<InstallationManager>,
        executor: Arc<ToolExecutor>,
        catalog: Arc<dyn ToolCatalog>,
        table: Arc<ServiceTableHandle>,
        pipeline_timeout: Duration,
    ) -> Self {
        Self {
            classifier,
            tool_need,
            resolver,
            installer,
            executor,
            catalog,
            table,
            pipeline_timeout,
        }
    }

    /// Handle one query. Total: always produces an outcome.
    pub async fn handle(&self, query: &str) -> QueryOutcome {
        tracing::info!(query_len = query.len(), "Handling query");

        let intent = self.classifier.classify(query).await;
        tracing::info!(
            intent = %intent.intent,
            confidence = intent.confidence,
            method = ?intent.method,
            "Query classified"
        );
        let mut outcome = QueryOutcome::for_intent(intent.clone());

        if !intent.intent.requires_tools() {
            return outcome;
        }

        let requirements = self.tool_need.resolve_tools(query, &intent).await;
        outcome.tool_requirements = requirements.clone();
        if requirements.is_empty() {
            outcome.errors.push(OutcomeError::new(
                OutcomeErrorKind::NoToolIdentified,
                "no available tool matches this request",
            ));
            return outcome;
        }

        let dispatch = self.dispatch_all(query, &requirements);
        match tokio::time::timeout(self.pipeline_timeout, dispatch).await {
            Ok(results) => {
                for sub in results {
                    if let Some(response) = sub.response {
                        outcome.execution_results.push(response);
                    }
                    if let Some(error) = sub.error {
                        outcome.errors.push(error);
                    }
                }
            }
            Err(_) => {
                // Pending sub-operations are abandoned, not killed; their
                // service processes stay reusable for the next query.
                tracing::warn!(
                    timeout_secs = self.pipeline_timeout.as_secs(),
                    "Tool dispatch deadline expired"
                );
                outcome.errors.push(OutcomeError::new(
                    OutcomeErrorKind::PipelineTimeout,
                    "tool dispatch did not finish within the pipeline deadline",
                ));
            }
        }

        outcome
    }

    /// Atomically replace the service table and drop cached install state.
    pub async fn reload_services(&self, table: ServiceTable) {
        self.table.reload(table).await;
        self.installer.invalidate_all();
    }

    /// Close every service connection.
    pub async fn shutdown(&self) {
        self.executor.shutdown_all().await;
    }

    /// Fan out all requirements; a failed sub-call never cancels siblings.
    async fn dispatch_all(&self, query: &str, requirements: &[ToolRequirement]) -> Vec<SubResult> {
        join_all(
            requirements
                .iter()
                .map(|requirement| self.dispatch_one(query, requirement)),
        )
        .await
    }

    async fn dispatch_one(&self, query: &str, requirement: &ToolRequirement) -> SubResult {
        let service = match self.resolver.resolve(&requirement.tool_name).await {
            Ok(service) => service,
            Err(e) => return SubResult::failed(OutcomeError::from(&e)),
        };

        let state = self.installer.ensure_installed(&service).await;
        if !state.installed {
            let err = Error::Installation {
                service_id: service.service_id.clone(),
                detail: state
                    .error
                    .unwrap_or_else(|| "runtime dependency missing".to_string()),
            };
            return SubResult::failed(OutcomeError::from(&err));
        }

        let arguments = serde_json::json!({ "query": query });
        if let Some(error) = self
            .validate_arguments(&requirement.tool_name, &arguments)
            .await
        {
            return SubResult::failed(error);
        }

        let request = ToolCallRequest::new(&requirement.tool_name, arguments);
        match self.executor.call(&service, &request).await {
            Ok(response) if response.is_success() => SubResult {
                response: Some(response),
                error: None,
            },
            Ok(response) => {
                // A rejection is surfaced both as the raw response and as a
                // typed error entry.
                let error = response.error.clone().map(|e| {
                    OutcomeError::new(
                        OutcomeErrorKind::ExecutionRejected,
                        format!(
                            "service rejected '{}': [{}] {}",
                            requirement.tool_name, e.code, e.message
                        ),
                    )
                });
                SubResult {
                    response: Some(response),
                    error,
                }
            }
            Err(e) => SubResult::failed(OutcomeError::from(&e)),
        }
    }

    /// Check declared required arguments before dispatch. Violations are
    /// the caller's mistake, not the service's, and are never retried.
    async fn validate_arguments(
        &self,
        tool_name: &str,
        arguments: &serde_json::Value,
    ) -> Option<OutcomeError> {
        let definition = match self.catalog.get(tool_name).await {
            Ok(Some(definition)) => definition,
            _ => return None,
        };
        let missing: Vec<&str> = definition
            .required_arguments()
            .into_iter()
            .filter(|name| arguments.get(name).is_none())
            .collect();
        if missing.is_empty() {
            None
        } else {
            Some(OutcomeError::new(
                OutcomeErrorKind::InvalidArguments,
                format!(
                    "tool '{}' is missing required argument(s): {}",
                    tool_name,
                    missing.join(", ")
                ),
            ))
        }
    }
}

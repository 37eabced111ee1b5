#![deny(unused)]
//! Switchboard - query routing and tool dispatch engine.
//!
//! Classifies a free-text request, names the tools it needs, resolves the
//! service for each tool, verifies the service's runtime dependency, and
//! dispatches the calls over line-delimited RPC.

use std::sync::Arc;
use std::time::Duration;

use switchboard_analysis::{AnalysisCache, IntentClassifier, KeywordAnalyzer, ToolNeedAnalyzer};
use switchboard_core::config::AppConfig;
use switchboard_core::traits::{LlmClient, ToolCatalog};
use switchboard_executor::ToolExecutor;
use switchboard_llm::{create_default_client, NullLlm};
use switchboard_pipeline::QueryEngine;
use switchboard_services::{
    InstallationManager, ServiceResolver, ServiceTable, ServiceTableHandle, StaticCatalog,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Switchboard v{}", env!("CARGO_PKG_VERSION"));

    let config = match AppConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::warn!(error = %e, "No loadable configuration, using defaults");
            AppConfig::default()
        }
    };

    // =========================================================================
    // Model provider
    // =========================================================================
    let llm: Arc<dyn LlmClient> = match create_default_client(&config.llm) {
        Ok(client) => Arc::new(client),
        Err(e) => {
            tracing::warn!(error = %e, "Running without a model provider; keyword analysis only");
            Arc::new(NullLlm)
        }
    };

    // =========================================================================
    // Analysis
    // =========================================================================
    let cache = Arc::new(AnalysisCache::new(
        Duration::from_secs(config.analysis.cache_ttl_secs),
        config.analysis.cache_capacity,
    ));
    let llm_timeout = Duration::from_secs(config.analysis.llm_timeout_secs);
    let classifier = IntentClassifier::new(
        llm.clone(),
        KeywordAnalyzer::new(config.analysis.default_confidence)?,
        cache.clone(),
        llm_timeout,
    );

    let catalog: Arc<dyn ToolCatalog> =
        Arc::new(StaticCatalog::from_definitions(config.catalog_definitions()));
    let tool_need = ToolNeedAnalyzer::new(llm, catalog.clone(), cache, llm_timeout);

    // =========================================================================
    // Services and execution
    // =========================================================================
    let table = Arc::new(ServiceTableHandle::new(ServiceTable::from_config(&config)?));
    let resolver = ServiceResolver::new(table.clone());
    let installer = Arc::new(InstallationManager::new(
        Duration::from_secs(config.installer.probe_ttl_secs),
        config.installer.auto_install,
    ));
    let executor = Arc::new(ToolExecutor::from_config(&config.executor));

    let engine = QueryEngine::new(
        classifier,
        tool_need,
        resolver,
        installer,
        executor,
        catalog,
        table,
        Duration::from_secs(config.pipeline.timeout_secs),
    );

    // One-shot query from argv; rendering beyond JSON is the caller's job.
    let query = std::env::args().skip(1).collect::<Vec<_>>().join(" ");
    if query.trim().is_empty() {
        anyhow::bail!("usage: switchboard <query>");
    }

    let outcome = engine.handle(&query).await;
    println!("{}", serde_json::to_string_pretty(&outcome)?);

    engine.shutdown().await;
    Ok(())
}

use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;

use crate::types::{ServiceDescriptor, ServiceKind, ToolDefinition};

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub analysis: AnalysisConfig,
    pub llm: LlmConfig,
    pub installer: InstallerConfig,
    pub executor: ExecutorConfig,
    pub pipeline: PipelineConfig,
    /// Named external services, keyed by service id.
    #[serde(default)]
    pub services: HashMap<String, ServiceEntry>,
    /// Tool name to candidate service ids, in preference order.
    #[serde(default)]
    pub tools: HashMap<String, Vec<String>>,
    /// Tool catalog entries served by the built-in static catalog.
    #[serde(default)]
    pub catalog: Vec<CatalogEntry>,
}

#[derive(Debug, Deserialize, Clone)]
pub struct AnalysisConfig {
    /// Below this confidence, extracted parameters are distrusted downstream.
    /// The classification result itself is always kept.
    pub confidence_threshold: f64,
    /// Confidence reported when no keyword rule clears its threshold.
    pub default_confidence: f64,
    /// Deadline for a single classification LLM call.
    pub llm_timeout_secs: u64,
    /// Analysis cache entry lifetime.
    pub cache_ttl_secs: u64,
    /// Analysis cache entry ceiling.
    pub cache_capacity: usize,
}

#[derive(Debug, Deserialize, Clone)]
pub struct LlmConfig {
    /// Provider name: "openai" or "anthropic".
    pub provider: String,
    /// Model identifier passed to the provider.
    pub model: String,
}

#[derive(Debug, Deserialize, Clone)]
pub struct InstallerConfig {
    /// Installation probe cache lifetime.
    pub probe_ttl_secs: u64,
    /// Whether absent package-manager dependencies are installed on demand.
    pub auto_install: bool,
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExecutorConfig {
    /// Ceiling on simultaneous in-flight tool calls across all services.
    pub max_concurrent_calls: usize,
    /// Attempts per call, including the first.
    pub retry_attempts: u32,
    /// Delay between attempts.
    pub retry_delay_ms: u64,
}

#[derive(Debug, Deserialize, Clone)]
pub struct PipelineConfig {
    /// Deadline for the tool-dispatch phase of one query.
    pub timeout_secs: u64,
}

/// A service as written in configuration; the map key supplies the id.
#[derive(Debug, Deserialize, Clone)]
pub struct ServiceEntry {
    pub kind: ServiceKind,
    pub command: String,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default)]
    pub env: HashMap<String, String>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default = "default_service_timeout")]
    pub timeout_secs: u64,
    #[serde(default)]
    pub working_directory: Option<String>,
    #[serde(default)]
    pub package: Option<String>,
}

impl ServiceEntry {
    /// Materialize a descriptor under the given id.
    pub fn into_descriptor(self, service_id: impl Into<String>) -> ServiceDescriptor {
        ServiceDescriptor {
            service_id: service_id.into(),
            kind: self.kind,
            command: self.command,
            args: self.args,
            env: self.env,
            enabled: self.enabled,
            timeout_secs: self.timeout_secs,
            working_directory: self.working_directory,
            package: self.package,
        }
    }
}

/// A catalog tool as written in configuration.
#[derive(Debug, Deserialize, Clone)]
pub struct CatalogEntry {
    pub name: String,
    pub description: String,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// Required argument names; the schema is derived from these.
    #[serde(default)]
    pub required: Vec<String>,
}

impl CatalogEntry {
    /// Build the boundary definition, deriving a minimal JSON schema.
    pub fn to_definition(&self) -> ToolDefinition {
        let properties: serde_json::Map<String, serde_json::Value> = self
            .required
            .iter()
            .map(|name| (name.clone(), serde_json::json!({ "type": "string" })))
            .collect();
        let mut def = ToolDefinition::new(&self.name, &self.description).with_parameters(
            serde_json::json!({
                "type": "object",
                "properties": properties,
                "required": self.required,
            }),
        );
        def.enabled = self.enabled;
        def
    }
}

fn default_enabled() -> bool {
    true
}

fn default_service_timeout() -> u64 {
    30
}

impl AppConfig {
    pub fn load() -> Result<Self, ConfigError> {
        let env = std::env::var("SWITCHBOARD_ENV").unwrap_or_else(|_| "development".into());

        let s = Config::builder()
            .add_source(File::with_name("config/default"))
            .add_source(File::with_name(&format!("config/{}", env)).required(false))
            .add_source(File::with_name("config/local").required(false))
            // Map SWITCHBOARD__EXECUTOR__MAX_CONCURRENT_CALLS=8 to executor.max_concurrent_calls
            .add_source(Environment::with_prefix("SWITCHBOARD").separator("__"))
            .build()?;

        s.try_deserialize()
    }

    /// Materialize service descriptors keyed by id.
    pub fn service_descriptors(&self) -> HashMap<String, ServiceDescriptor> {
        self.services
            .iter()
            .map(|(id, entry)| (id.clone(), entry.clone().into_descriptor(id.clone())))
            .collect()
    }

    /// Materialize the static catalog definitions.
    pub fn catalog_definitions(&self) -> Vec<ToolDefinition> {
        self.catalog.iter().map(CatalogEntry::to_definition).collect()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            analysis: AnalysisConfig {
                confidence_threshold: 0.6,
                default_confidence: 0.5,
                llm_timeout_secs: 10,
                cache_ttl_secs: 300,
                cache_capacity: 256,
            },
            llm: LlmConfig {
                provider: "openai".into(),
                model: "gpt-4o-mini".into(),
            },
            installer: InstallerConfig {
                probe_ttl_secs: 300,
                auto_install: true,
            },
            executor: ExecutorConfig {
                max_concurrent_calls: 4,
                retry_attempts: 2,
                retry_delay_ms: 500,
            },
            pipeline: PipelineConfig { timeout_secs: 120 },
            services: HashMap::new(),
            tools: HashMap::new(),
            catalog: Vec::new(),
        }
    }
}

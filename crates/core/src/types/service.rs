use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::Duration;

// =============================================================================
// Service Types
// =============================================================================

/// How a service's runtime dependency is provisioned and probed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ServiceKind {
    /// Launched through a package-manager runner; installable on demand.
    PackageManager,
    /// A module of the host language runtime; assumed bundled, never installed.
    LanguageModule,
    /// A standalone executable; presence is probed, never installed.
    NativeBinary,
}

impl std::fmt::Display for ServiceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PackageManager => write!(f, "package_manager"),
            Self::LanguageModule => write!(f, "language_module"),
            Self::NativeBinary => write!(f, "native_binary"),
        }
    }
}

/// A configured external service capable of executing tools over RPC.
///
/// Loaded from static configuration at process start; read-only during a
/// request. A reload replaces the whole table, never individual fields.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServiceDescriptor {
    /// Unique service identifier.
    pub service_id: String,

    /// Runtime dependency kind, drives installation probing.
    pub kind: ServiceKind,

    /// Executable to spawn.
    pub command: String,

    /// Arguments, in order.
    #[serde(default)]
    pub args: Vec<String>,

    /// Extra environment for the child process.
    #[serde(default)]
    pub env: HashMap<String, String>,

    /// Disabled services are never probed or spawned.
    pub enabled: bool,

    /// Per-call deadline in seconds.
    pub timeout_secs: u64,

    /// Working directory for the child process.
    #[serde(default)]
    pub working_directory: Option<String>,

    /// Package or module name used by installation probes.
    #[serde(default)]
    pub package: Option<String>,
}

impl ServiceDescriptor {
    /// Per-call deadline as a `Duration`.
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Cached knowledge of whether a service's runtime dependency is present.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InstallationState {
    /// Service this state describes.
    pub service_id: String,
    /// Whether the dependency is present.
    pub installed: bool,
    /// When the check ran.
    pub checked_at: DateTime<Utc>,
    /// Diagnostic from a failed probe or install.
    pub error: Option<String>,
}

impl InstallationState {
    /// Record a successful presence check.
    pub fn present(service_id: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            installed: true,
            checked_at: Utc::now(),
            error: None,
        }
    }

    /// Record an absent dependency with a diagnostic.
    pub fn absent(service_id: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            service_id: service_id.into(),
            installed: false,
            checked_at: Utc::now(),
            error: Some(error.into()),
        }
    }
}

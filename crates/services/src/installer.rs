//! Installation probing and on-demand installs for external services.

use dashmap::DashMap;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

use switchboard_core::{
    types::{InstallationState, ServiceDescriptor, ServiceKind},
    Error, Result,
};

/// Package-manager family a service launches through.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum PackageManager {
    Uv,
    Npm,
    Pip,
}

impl PackageManager {
    /// Detect the family from the configured launch command.
    fn detect(command: &str) -> Option<Self> {
        let basename = command.rsplit(['/', '\\']).next().unwrap_or(command);
        match basename {
            "uv" | "uvx" => Some(Self::Uv),
            "npm" | "npx" => Some(Self::Npm),
            "pip" | "pip3" | "pipx" => Some(Self::Pip),
            _ => None,
        }
    }

    fn binary(&self) -> &'static str {
        match self {
            Self::Uv => "uv",
            Self::Npm => "npm",
            Self::Pip => "pip",
        }
    }

    /// Read-only listing scoped to the package.
    fn probe_args(&self, package: &str) -> Vec<String> {
        match self {
            Self::Uv => vec!["tool".into(), "list".into()],
            Self::Npm => vec![
                "ls".into(),
                "-g".into(),
                package.into(),
                "--depth=0".into(),
            ],
            Self::Pip => vec!["show".into(), package.into()],
        }
    }

    fn install_args(&self, package: &str) -> Vec<String> {
        match self {
            Self::Uv => vec!["tool".into(), "install".into(), package.into()],
            Self::Npm => vec!["install".into(), "-g".into(), package.into()],
            Self::Pip => vec!["install".into(), package.into()],
        }
    }

    /// Interpret the probe output.
    fn present_in(&self, package: &str, output: &std::process::Output) -> bool {
        match self {
            // `uv tool list` succeeds even with nothing installed; the
            // package must actually appear in the listing.
            Self::Uv => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains(package)
            }
            Self::Npm => {
                output.status.success()
                    && String::from_utf8_lossy(&output.stdout).contains(package)
            }
            Self::Pip => output.status.success(),
        }
    }
}

/// Verifies, and for package-manager services installs, a service's runtime
/// dependency before the executor is allowed to spawn it.
///
/// Probe results are cached per service id with a TTL so repeated queries
/// do not pay for subprocess round-trips. A reload invalidates the cache.
pub struct InstallationManager {
    cache: DashMap<String, InstallationState>,
    ttl: Duration,
    auto_install: bool,
}

impl InstallationManager {
    pub fn new(ttl: Duration, auto_install: bool) -> Self {
        Self {
            cache: DashMap::new(),
            ttl,
            auto_install,
        }
    }

    /// Check (and if configured, install) the service's dependency.
    ///
    /// Never returns an error: failures are recorded inside the state so
    /// the caller can render them. An `installed: false` state is a hard
    /// precondition failure for the executor.
    pub async fn ensure_installed(&self, service: &ServiceDescriptor) -> InstallationState {
        if let Some(cached) = self.cache.get(&service.service_id) {
            if self.is_fresh(&cached) {
                tracing::debug!(
                    service = %service.service_id,
                    installed = cached.installed,
                    "Installation state cache hit"
                );
                return cached.clone();
            }
        }

        let state = match service.kind {
            ServiceKind::PackageManager => self.check_package_manager(service).await,
            ServiceKind::LanguageModule => self.check_language_module(service).await,
            ServiceKind::NativeBinary => self.check_native_binary(service).await,
        };

        tracing::info!(
            service = %service.service_id,
            kind = %service.kind,
            installed = state.installed,
            "Installation check completed"
        );
        self.cache.insert(service.service_id.clone(), state.clone());
        state
    }

    /// Drop every cached state, forcing fresh probes.
    pub fn invalidate_all(&self) {
        self.cache.clear();
    }

    fn is_fresh(&self, state: &InstallationState) -> bool {
        let age = chrono::Utc::now().signed_duration_since(state.checked_at);
        match chrono::Duration::from_std(self.ttl) {
            Ok(ttl) => age < ttl,
            Err(_) => true,
        }
    }

    async fn check_package_manager(&self, service: &ServiceDescriptor) -> InstallationState {
        let Some(package) = service.package.as_deref() else {
            return InstallationState::absent(
                &service.service_id,
                "package_manager service has no package configured",
            );
        };
        let Some(manager) = PackageManager::detect(&service.command) else {
            return InstallationState::absent(
                &service.service_id,
                format!("unrecognized package manager command '{}'", service.command),
            );
        };

        match run_scoped(manager.binary(), &manager.probe_args(package), service).await {
            Ok(output) if manager.present_in(package, &output) => {
                InstallationState::present(&service.service_id)
            }
            Ok(_) if self.auto_install => self.install_package(manager, package, service).await,
            Ok(output) => InstallationState::absent(
                &service.service_id,
                format!(
                    "package '{}' not installed: {}",
                    package,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ),
            Err(e) => InstallationState::absent(&service.service_id, e.to_string()),
        }
    }

    async fn install_package(
        &self,
        manager: PackageManager,
        package: &str,
        service: &ServiceDescriptor,
    ) -> InstallationState {
        tracing::info!(
            service = %service.service_id,
            package = %package,
            "Installing missing package"
        );
        match run_scoped(manager.binary(), &manager.install_args(package), service).await {
            Ok(output) if output.status.success() => InstallationState::present(&service.service_id),
            Ok(output) => InstallationState::absent(
                &service.service_id,
                format!(
                    "install of '{}' failed: {}",
                    package,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            ),
            Err(e) => InstallationState::absent(&service.service_id, e.to_string()),
        }
    }

    /// Presence probe for a host-language module. Never installs; these are
    /// assumed bundled with the host application.
    async fn check_language_module(&self, service: &ServiceDescriptor) -> InstallationState {
        let Some(module) = service.package.as_deref() else {
            return InstallationState::absent(
                &service.service_id,
                "language_module service has no module configured",
            );
        };
        let probe = format!(
            "import importlib.util, sys; sys.exit(0 if importlib.util.find_spec('{}') else 1)",
            module
        );
        let args = vec!["-c".to_string(), probe];

        match run_scoped("python3", &args, service).await {
            Ok(output) if output.status.success() => {
                InstallationState::present(&service.service_id)
            }
            Ok(_) => InstallationState::absent(
                &service.service_id,
                format!("module '{}' cannot be resolved", module),
            ),
            Err(e) => InstallationState::absent(&service.service_id, e.to_string()),
        }
    }

    /// Help-flag probe for a standalone executable. Absence is reported,
    /// never repaired; a system-level install is outside this engine.
    async fn check_native_binary(&self, service: &ServiceDescriptor) -> InstallationState {
        let args = vec!["--help".to_string()];
        match run_scoped(&service.command, &args, service).await {
            Ok(output) if output.status.success() => {
                InstallationState::present(&service.service_id)
            }
            Ok(output) => InstallationState::absent(
                &service.service_id,
                format!("'{} --help' exited with {}", service.command, output.status),
            ),
            Err(e) => InstallationState::absent(&service.service_id, e.to_string()),
        }
    }
}

/// Run a short-lived command with the service's env, cwd, and timeout.
async fn run_scoped(
    program: &str,
    args: &[String],
    service: &ServiceDescriptor,
) -> Result<std::process::Output> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .envs(&service.env)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);
    if let Some(dir) = &service.working_directory {
        cmd.current_dir(dir);
    }

    let output = tokio::time::timeout(service.timeout(), cmd.output())
        .await
        .map_err(|_| {
            Error::installation(
                &service.service_id,
                format!("'{}' did not finish within {}s", program, service.timeout_secs),
            )
        })?
        .map_err(|e| {
            Error::installation(&service.service_id, format!("failed to run '{}': {}", program, e))
        })?;
    Ok(output)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn service(id: &str, kind: ServiceKind, command: &str, package: Option<&str>) -> ServiceDescriptor {
        ServiceDescriptor {
            service_id: id.to_string(),
            kind,
            command: command.to_string(),
            args: Vec::new(),
            env: HashMap::new(),
            enabled: true,
            timeout_secs: 10,
            working_directory: None,
            package: package.map(str::to_string),
        }
    }

    #[test]
    fn test_manager_detection() {
        assert_eq!(PackageManager::detect("uvx"), Some(PackageManager::Uv));
        assert_eq!(PackageManager::detect("/usr/bin/npx"), Some(PackageManager::Npm));
        assert_eq!(PackageManager::detect("pip3"), Some(PackageManager::Pip));
        assert_eq!(PackageManager::detect("cargo"), None);
    }

    #[tokio::test]
    async fn test_native_binary_present() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service("ls-svc", ServiceKind::NativeBinary, "ls", None);

        let state = manager.ensure_installed(&svc).await;
        assert!(state.installed, "diagnostic: {:?}", state.error);
    }

    #[tokio::test]
    async fn test_native_binary_missing() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service(
            "ghost-svc",
            ServiceKind::NativeBinary,
            "/definitely/not/a/binary",
            None,
        );

        let state = manager.ensure_installed(&svc).await;
        assert!(!state.installed);
        assert!(state.error.is_some());
    }

    #[tokio::test]
    async fn test_language_module_present() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service("json-svc", ServiceKind::LanguageModule, "python3", Some("json"));

        let state = manager.ensure_installed(&svc).await;
        assert!(state.installed, "diagnostic: {:?}", state.error);
    }

    #[tokio::test]
    async fn test_language_module_missing() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service(
            "ghost-mod",
            ServiceKind::LanguageModule,
            "python3",
            Some("definitely_not_a_module_xyz"),
        );

        let state = manager.ensure_installed(&svc).await;
        assert!(!state.installed);
    }

    #[tokio::test]
    async fn test_package_without_name_is_absent() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service("pm-svc", ServiceKind::PackageManager, "uvx", None);

        let state = manager.ensure_installed(&svc).await;
        assert!(!state.installed);
        assert!(state.error.as_deref().unwrap().contains("no package"));
    }

    #[tokio::test]
    async fn test_probe_result_is_cached() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service("ls-svc", ServiceKind::NativeBinary, "ls", None);

        let first = manager.ensure_installed(&svc).await;
        let second = manager.ensure_installed(&svc).await;
        // Same checked_at proves the second call never re-probed.
        assert_eq!(first.checked_at, second.checked_at);
    }

    #[tokio::test]
    async fn test_invalidate_forces_fresh_probe() {
        let manager = InstallationManager::new(Duration::from_secs(60), false);
        let svc = service("ls-svc", ServiceKind::NativeBinary, "ls", None);

        let first = manager.ensure_installed(&svc).await;
        manager.invalidate_all();
        tokio::time::sleep(Duration::from_millis(5)).await;
        let second = manager.ensure_installed(&svc).await;
        assert_ne!(first.checked_at, second.checked_at);
    }
}

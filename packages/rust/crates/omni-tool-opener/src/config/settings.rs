//! Runtime settings loader for omni-tool-opener.
//!
//! Loads and merges:
//! - System defaults: `<PRJ_ROOT>/packages/conf/settings.yaml`
//! - User overrides:  `<PRJ_CONFIG_HOME>/omni-tool-opener/settings.yaml`
//!
//! Merge precedence is user over system.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;
use std::time::Duration;

use serde::Deserialize;

use crate::catalog::ResourceCatalog;
use crate::driver::AppleScriptDriverConfig;
use crate::jobs::{DurationPolicy, LifecycleManagerConfig};

const DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH: &str = "packages/conf/settings.yaml";
const DEFAULT_USER_SETTINGS_RELATIVE_PATH: &str = "omni-tool-opener/settings.yaml";
const DEFAULT_CONFIG_HOME_RELATIVE_PATH: &str = ".config";
/// Listen address when neither settings nor CLI name one.
pub const DEFAULT_BIND_ADDR: &str = "127.0.0.1:5005";
static CONFIG_HOME_OVERRIDE: OnceLock<PathBuf> = OnceLock::new();

#[derive(Debug, Clone, Default, Deserialize)]
pub struct RuntimeSettings {
    #[serde(default)]
    pub gateway: GatewaySettings,
    #[serde(default)]
    pub jobs: JobSettings,
    #[serde(default)]
    pub driver: DriverSettings,
    /// Extra or overriding `name -> location` catalog rows.
    #[serde(default)]
    pub catalog: Option<BTreeMap<String, String>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct GatewaySettings {
    pub bind: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct JobSettings {
    pub default_duration_secs: Option<u64>,
    pub max_duration_secs: Option<u64>,
    pub duration_policy: Option<String>,
    pub queue_capacity: Option<usize>,
    pub max_in_flight: Option<usize>,
    pub retain_finished: Option<usize>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DriverSettings {
    pub application: Option<String>,
    pub program: Option<String>,
    pub script_timeout_secs: Option<u64>,
}

impl RuntimeSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            gateway: self.gateway.merge(overlay.gateway),
            jobs: self.jobs.merge(overlay.jobs),
            driver: self.driver.merge(overlay.driver),
            catalog: merge_catalog(self.catalog, overlay.catalog),
        }
    }

    /// Effective listen address.
    #[must_use]
    pub fn bind_addr(&self) -> String {
        self.gateway
            .bind
            .as_deref()
            .map(str::trim)
            .filter(|bind| !bind.is_empty())
            .unwrap_or(DEFAULT_BIND_ADDR)
            .to_string()
    }

    /// Lifecycle manager config with unset fields at their defaults.
    #[must_use]
    pub fn lifecycle_config(&self) -> LifecycleManagerConfig {
        let defaults = LifecycleManagerConfig::default();
        let duration_policy = match self.jobs.duration_policy.as_deref() {
            None => defaults.duration_policy,
            Some(raw) => raw.parse::<DurationPolicy>().unwrap_or_else(|error| {
                tracing::warn!(%error, "invalid jobs.duration_policy; using default");
                defaults.duration_policy
            }),
        };
        LifecycleManagerConfig {
            default_duration_secs: self
                .jobs
                .default_duration_secs
                .unwrap_or(defaults.default_duration_secs),
            max_duration_secs: self
                .jobs
                .max_duration_secs
                .unwrap_or(defaults.max_duration_secs),
            duration_policy,
            queue_capacity: self.jobs.queue_capacity.unwrap_or(defaults.queue_capacity),
            max_in_flight: self.jobs.max_in_flight.unwrap_or(defaults.max_in_flight),
            retain_finished: self
                .jobs
                .retain_finished
                .unwrap_or(defaults.retain_finished),
        }
    }

    /// Driver config with unset fields at their defaults.
    #[must_use]
    pub fn driver_config(&self) -> AppleScriptDriverConfig {
        let defaults = AppleScriptDriverConfig::default();
        AppleScriptDriverConfig {
            application: self
                .driver
                .application
                .clone()
                .unwrap_or(defaults.application),
            program: self.driver.program.clone().unwrap_or(defaults.program),
            script_timeout: self
                .driver
                .script_timeout_secs
                .map_or(defaults.script_timeout, |secs| {
                    Duration::from_secs(secs.max(1))
                }),
        }
    }

    /// Built-in catalog with configured rows applied.
    #[must_use]
    pub fn catalog(&self) -> ResourceCatalog {
        match self.catalog.as_ref() {
            Some(overrides) => ResourceCatalog::builtin().with_overrides(overrides),
            None => ResourceCatalog::builtin(),
        }
    }
}

impl GatewaySettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            bind: overlay.bind.or(self.bind),
        }
    }
}

impl JobSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            default_duration_secs: overlay
                .default_duration_secs
                .or(self.default_duration_secs),
            max_duration_secs: overlay.max_duration_secs.or(self.max_duration_secs),
            duration_policy: overlay.duration_policy.or(self.duration_policy),
            queue_capacity: overlay.queue_capacity.or(self.queue_capacity),
            max_in_flight: overlay.max_in_flight.or(self.max_in_flight),
            retain_finished: overlay.retain_finished.or(self.retain_finished),
        }
    }
}

impl DriverSettings {
    fn merge(self, overlay: Self) -> Self {
        Self {
            application: overlay.application.or(self.application),
            program: overlay.program.or(self.program),
            script_timeout_secs: overlay.script_timeout_secs.or(self.script_timeout_secs),
        }
    }
}

fn merge_catalog(
    base: Option<BTreeMap<String, String>>,
    overlay: Option<BTreeMap<String, String>>,
) -> Option<BTreeMap<String, String>> {
    match (base, overlay) {
        (None, None) => None,
        (Some(entries), None) | (None, Some(entries)) => Some(entries),
        (Some(mut entries), Some(overlay_entries)) => {
            entries.extend(overlay_entries);
            Some(entries)
        }
    }
}

/// Load merged runtime settings (user overrides system).
pub fn load_runtime_settings() -> RuntimeSettings {
    let (system_path, user_path) = runtime_settings_paths();
    load_runtime_settings_from_paths(&system_path, &user_path)
}

#[doc(hidden)]
pub fn runtime_settings_paths() -> (PathBuf, PathBuf) {
    let root = project_root();
    let system_path = root.join(DEFAULT_SYSTEM_SETTINGS_RELATIVE_PATH);
    let user_path = resolve_config_home(&root).join(DEFAULT_USER_SETTINGS_RELATIVE_PATH);
    (system_path, user_path)
}

#[doc(hidden)]
pub fn load_runtime_settings_from_paths(system: &Path, user: &Path) -> RuntimeSettings {
    load_one(system).merge(load_one(user))
}

fn load_one(path: &Path) -> RuntimeSettings {
    if !path.exists() {
        return RuntimeSettings::default();
    }
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to read settings file; ignoring"
            );
            return RuntimeSettings::default();
        }
    };
    match serde_yaml::from_str::<RuntimeSettings>(&raw) {
        Ok(value) => value,
        Err(error) => {
            tracing::warn!(
                path = %path.display(),
                error = %error,
                "failed to parse settings yaml; ignoring file"
            );
            RuntimeSettings::default()
        }
    }
}

fn project_root() -> PathBuf {
    std::env::var("PRJ_ROOT")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .unwrap_or_else(|| std::env::current_dir().unwrap_or_else(|_| PathBuf::from(".")))
}

/// Set config-home override (used by CLI `--conf`).
///
/// The path can be absolute, or relative to `PRJ_ROOT`/cwd.
pub fn set_config_home_override(path: impl Into<PathBuf>) {
    let path = path.into();
    if path.as_os_str().is_empty() {
        return;
    }
    if CONFIG_HOME_OVERRIDE.set(path.clone()).is_err()
        && let Some(current) = CONFIG_HOME_OVERRIDE.get()
        && current != &path
    {
        tracing::warn!(
            current = %current.display(),
            ignored = %path.display(),
            "config home override already set; ignoring subsequent value"
        );
    }
}

fn resolve_config_home(project_root: &Path) -> PathBuf {
    if let Some(path) = CONFIG_HOME_OVERRIDE.get() {
        return absolutize(project_root, path.clone());
    }

    let configured = std::env::var("PRJ_CONFIG_HOME")
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| DEFAULT_CONFIG_HOME_RELATIVE_PATH.to_string());
    absolutize(project_root, PathBuf::from(configured))
}

fn absolutize(project_root: &Path, path: PathBuf) -> PathBuf {
    if path.is_absolute() {
        path
    } else {
        project_root.join(path)
    }
}

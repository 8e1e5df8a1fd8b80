// src/config/model.rs

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::Deserialize;

use crate::process::{CmdOptions, DEFAULT_STOP_GRACE, DEFAULT_TIMEOUT};
use crate::retry::{RetryPolicy, WaitPreset};
use crate::types::PlatformSetting;

/// Top-level configuration as read from a TOML file, before validation.
///
/// ```toml
/// [wait]
/// short = "5s"
/// long = "90s"
/// first_delay = "20ms"
///
/// [process]
/// default_timeout = "30s"
///
/// [cluster]
/// namespace = "monitoring-e2e"
/// platform = "minikube"
/// ```
///
/// All sections are optional. Durations are strings such as `"250ms"`,
/// `"3s"`, `"1m"`.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub wait: RawWaitSection,

    #[serde(default)]
    pub process: RawProcessSection,

    #[serde(default)]
    pub cluster: ClusterSection,
}

/// `[wait]` section: preset budgets and backoff bounds.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawWaitSection {
    #[serde(default)]
    pub short: Option<String>,
    #[serde(default)]
    pub medium: Option<String>,
    #[serde(default)]
    pub long: Option<String>,
    #[serde(default)]
    pub longest: Option<String>,
    #[serde(default)]
    pub first_delay: Option<String>,
    #[serde(default)]
    pub max_delay: Option<String>,
}

/// `[process]` section.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawProcessSection {
    /// Timeout for synchronous commands.
    #[serde(default)]
    pub default_timeout: Option<String>,

    /// How long a background process may take to exit after SIGTERM.
    #[serde(default)]
    pub stop_grace: Option<String>,

    /// Extra environment for every command, e.g. a `PATH` pointing at
    /// pinned tool versions.
    #[serde(default)]
    pub env: BTreeMap<String, String>,
}

/// `[cluster]` section. Used as-is after validation.
#[derive(Debug, Clone, Deserialize)]
pub struct ClusterSection {
    /// Namespace the stack under test is installed into.
    #[serde(default = "default_namespace")]
    pub namespace: String,

    /// Exported as `KUBECONFIG` to commands built from the test environment.
    /// When unset, tools fall back to their own default lookup.
    #[serde(default)]
    pub kubeconfig: Option<PathBuf>,

    #[serde(default)]
    pub platform: PlatformSetting,

    /// Service exposed through an OpenShift route.
    #[serde(default = "default_console_service")]
    pub console_service: String,

    /// NodePort the console is exposed on under minikube.
    #[serde(default = "default_node_port")]
    pub node_port: u16,
}

fn default_namespace() -> String {
    "lightbend-test".to_string()
}

fn default_console_service() -> String {
    "console-server".to_string()
}

fn default_node_port() -> u16 {
    30080
}

impl Default for ClusterSection {
    fn default() -> Self {
        Self {
            namespace: default_namespace(),
            kubeconfig: None,
            platform: PlatformSetting::default(),
            console_service: default_console_service(),
            node_port: default_node_port(),
        }
    }
}

/// Validated configuration.
///
/// Constructed via `TryFrom<RawConfigFile>` (see `validate.rs`) so every
/// policy in here already satisfies the retry invariants.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub wait: WaitSettings,
    pub process: ProcessSettings,
    pub cluster: ClusterSection,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaitSettings {
    pub short: RetryPolicy,
    pub medium: RetryPolicy,
    pub long: RetryPolicy,
    pub longest: RetryPolicy,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessSettings {
    pub default_timeout: Duration,
    pub stop_grace: Duration,
    pub env: BTreeMap<String, String>,
}

impl ConfigFile {
    /// Retry policy for a named preset.
    pub fn policy(&self, preset: WaitPreset) -> RetryPolicy {
        match preset {
            WaitPreset::Short => self.wait.short,
            WaitPreset::Medium => self.wait.medium,
            WaitPreset::Long => self.wait.long,
            WaitPreset::Longest => self.wait.longest,
        }
    }

    /// Command options seeded with the configured timeout, stop grace and
    /// environment.
    pub fn cmd_options(&self) -> CmdOptions {
        CmdOptions {
            timeout: Some(self.process.default_timeout),
            env: self.process.env.clone(),
            stop_grace: self.process.stop_grace,
            ..CmdOptions::default()
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            wait: WaitSettings {
                short: WaitPreset::Short.policy(),
                medium: WaitPreset::Medium.policy(),
                long: WaitPreset::Long.policy(),
                longest: WaitPreset::Longest.policy(),
            },
            process: ProcessSettings {
                default_timeout: DEFAULT_TIMEOUT,
                stop_grace: DEFAULT_STOP_GRACE,
                env: BTreeMap::new(),
            },
            cluster: ClusterSection::default(),
        }
    }
}

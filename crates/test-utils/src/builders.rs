#![allow(dead_code)]

use std::path::{Path, PathBuf};

use probekit::config::{ConfigFile, RawConfigFile};
use probekit::types::PlatformSetting;

/// Builder for `ConfigFile` to simplify test setup.
///
/// Durations are given as config strings so the builder goes through the
/// same validation as a file on disk.
pub struct ConfigFileBuilder {
    config: RawConfigFile,
}

impl ConfigFileBuilder {
    pub fn new() -> Self {
        Self {
            config: RawConfigFile::default(),
        }
    }

    pub fn with_short_wait(mut self, value: &str) -> Self {
        self.config.wait.short = Some(value.to_string());
        self
    }

    pub fn with_backoff(mut self, first_delay: &str, max_delay: &str) -> Self {
        self.config.wait.first_delay = Some(first_delay.to_string());
        self.config.wait.max_delay = Some(max_delay.to_string());
        self
    }

    pub fn with_default_timeout(mut self, value: &str) -> Self {
        self.config.process.default_timeout = Some(value.to_string());
        self
    }

    pub fn with_stop_grace(mut self, value: &str) -> Self {
        self.config.process.stop_grace = Some(value.to_string());
        self
    }

    pub fn with_env(mut self, name: &str, value: &str) -> Self {
        self.config
            .process
            .env
            .insert(name.to_string(), value.to_string());
        self
    }

    /// Resolve commands only from `dir`, e.g. a temp dir of fake `oc` /
    /// `minikube` scripts.
    pub fn with_path(self, dir: &Path) -> Self {
        self.with_env("PATH", &dir.display().to_string())
    }

    pub fn with_platform(mut self, platform: PlatformSetting) -> Self {
        self.config.cluster.platform = platform;
        self
    }

    pub fn with_namespace(mut self, namespace: &str) -> Self {
        self.config.cluster.namespace = namespace.to_string();
        self
    }

    pub fn with_kubeconfig(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.cluster.kubeconfig = Some(path.into());
        self
    }

    pub fn build_raw(self) -> RawConfigFile {
        self.config
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.config).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigFileBuilder {
    fn default() -> Self {
        Self::new()
    }
}

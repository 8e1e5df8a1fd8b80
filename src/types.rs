// src/types.rs

use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// Kubernetes flavour the stack under test is installed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Platform {
    Minikube,
    Openshift,
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Platform::Minikube => f.write_str("minikube"),
            Platform::Openshift => f.write_str("openshift"),
        }
    }
}

/// `[cluster].platform` in the config file.
///
/// - `Auto` (default): probe `minikube status`, then `oc status`.
/// - `Minikube` / `Openshift`: skip detection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PlatformSetting {
    #[default]
    Auto,
    Minikube,
    Openshift,
}

impl PlatformSetting {
    /// The fixed platform, or `None` when it has to be detected.
    pub fn fixed(self) -> Option<Platform> {
        match self {
            PlatformSetting::Auto => None,
            PlatformSetting::Minikube => Some(Platform::Minikube),
            PlatformSetting::Openshift => Some(Platform::Openshift),
        }
    }
}

impl FromStr for PlatformSetting {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(PlatformSetting::Auto),
            "minikube" => Ok(PlatformSetting::Minikube),
            "openshift" | "oc" => Ok(PlatformSetting::Openshift),
            other => Err(format!(
                "invalid platform: {other} (expected \"auto\", \"minikube\" or \"openshift\")"
            )),
        }
    }
}

// src/env/mod.rs

//! The cluster a test suite runs against.
//!
//! [`TestEnv::init`] detects (or is told) the platform, works out where the
//! console is reachable and derives the addresses of the services proxied
//! behind it. The handle is passed to tests explicitly and cleaned up with
//! [`TestEnv::close`].

pub mod platform;
pub mod route;

use tracing::{info, warn};

use crate::config::{ClusterSection, ConfigFile};
use crate::errors::Result;
use crate::process::{Cmd, CmdOptions};
use crate::retry::{WaitPreset, wait_until_success};
use crate::types::Platform;

pub use platform::{
    detect_platform, minikube_ip, openshift_expose, openshift_route_host, openshift_unexpose,
};
pub use route::{Route, RouteList};

/// Services reachable through the console's `/service/<name>` proxy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServiceAddrs {
    pub prometheus: String,
    pub console_api: String,
    pub grafana: String,
    pub alertmanager: String,
    pub legacy_monitor_api: String,
}

impl ServiceAddrs {
    pub fn from_console(console_addr: &str) -> Self {
        let base = console_addr.trim_end_matches('/');
        let service = |name: &str| format!("{base}/service/{name}");

        Self {
            prometheus: service("prometheus"),
            console_api: service("console-api"),
            grafana: service("grafana"),
            alertmanager: service("alertmanager"),
            legacy_monitor_api: service("es-monitor-api"),
        }
    }
}

/// Where the console answers, and whether a route was created to get there.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsoleAddr {
    pub url: String,
    pub route_exposed: bool,
}

/// Resolve the console URL on `platform`.
///
/// - Minikube: `http://<minikube ip>:<node_port>`.
/// - OpenShift: expose the console service and read back its route host.
pub async fn console_address(
    platform: Platform,
    cfg: &ConfigFile,
    options: &CmdOptions,
) -> Result<ConsoleAddr> {
    match platform {
        Platform::Minikube => {
            let ip = minikube_ip(options).await?;
            Ok(ConsoleAddr {
                url: format!("http://{ip}:{}", cfg.cluster.node_port),
                route_exposed: false,
            })
        }
        Platform::Openshift => {
            let service = cfg.cluster.console_service.as_str();
            openshift_expose(service, options).await?;

            // The route shows up in `oc get route` shortly after `oc expose`.
            let host = wait_until_success(cfg.policy(WaitPreset::Short), move || {
                openshift_route_host(service, options)
            })
            .await?;
            Ok(ConsoleAddr {
                url: format!("http://{host}"),
                route_exposed: true,
            })
        }
    }
}

/// Handle to an initialised test environment.
#[derive(Debug, Clone)]
pub struct TestEnv {
    platform: Platform,
    cluster: ClusterSection,
    cmd_options: CmdOptions,
    console_addr: String,
    addrs: ServiceAddrs,
    route_exposed: bool,
}

impl TestEnv {
    /// Detect the platform (unless configured) and resolve the console
    /// address.
    ///
    /// On OpenShift this exposes the console service through a route, which
    /// [`close`](Self::close) removes again.
    pub async fn init(cfg: &ConfigFile) -> Result<Self> {
        let cmd_options = base_cmd_options(cfg);

        let platform = match cfg.cluster.platform.fixed() {
            Some(platform) => platform,
            None => detect_platform(&cmd_options).await?,
        };
        info!(%platform, namespace = %cfg.cluster.namespace, "initialising test environment");

        let ConsoleAddr {
            url: console_addr,
            route_exposed,
        } = console_address(platform, cfg, &cmd_options).await?;
        info!(console = %console_addr, "resolved console address");

        Ok(Self {
            platform,
            cluster: cfg.cluster.clone(),
            addrs: ServiceAddrs::from_console(&console_addr),
            console_addr,
            cmd_options,
            route_exposed,
        })
    }

    /// Handle for an already known console address; runs no commands.
    pub fn from_console_addr(platform: Platform, cfg: &ConfigFile, console_addr: &str) -> Self {
        let console_addr = console_addr.trim_end_matches('/').to_string();
        Self {
            platform,
            cluster: cfg.cluster.clone(),
            cmd_options: base_cmd_options(cfg),
            addrs: ServiceAddrs::from_console(&console_addr),
            console_addr,
            route_exposed: false,
        }
    }

    pub fn platform(&self) -> Platform {
        self.platform
    }

    pub fn namespace(&self) -> &str {
        &self.cluster.namespace
    }

    pub fn console_addr(&self) -> &str {
        &self.console_addr
    }

    pub fn addrs(&self) -> &ServiceAddrs {
        &self.addrs
    }

    /// Command preloaded with the configured timeout, environment and
    /// `KUBECONFIG`.
    pub fn cmd(&self, program: impl Into<String>) -> Cmd {
        Cmd::new(program).with_options(self.cmd_options.clone())
    }

    /// `kubectl -n <namespace>`.
    pub fn kubectl(&self) -> Cmd {
        self.cmd("kubectl").args(["-n", self.cluster.namespace.as_str()])
    }

    /// Undo what [`init`](Self::init) set up. Failures are logged, not
    /// returned.
    pub async fn close(self) {
        if !self.route_exposed {
            return;
        }
        if let Err(err) = openshift_unexpose(&self.cluster.console_service, &self.cmd_options).await {
            warn!(error = %err, service = %self.cluster.console_service, "failed to remove route");
        }
    }
}

fn base_cmd_options(cfg: &ConfigFile) -> CmdOptions {
    let mut options = cfg.cmd_options();
    if let Some(kubeconfig) = &cfg.cluster.kubeconfig {
        options
            .env
            .insert("KUBECONFIG".to_string(), kubeconfig.display().to_string());
    }
    options
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn service_addresses_hang_off_the_console() {
        let addrs = ServiceAddrs::from_console("http://192.168.49.2:30080/");
        assert_eq!(addrs.prometheus, "http://192.168.49.2:30080/service/prometheus");
        assert_eq!(addrs.console_api, "http://192.168.49.2:30080/service/console-api");
        assert_eq!(addrs.legacy_monitor_api, "http://192.168.49.2:30080/service/es-monitor-api");
    }

    #[test]
    fn from_console_addr_keeps_cluster_settings() {
        let mut cfg = ConfigFile::default();
        cfg.cluster.namespace = "e2e".to_string();
        cfg.cluster.kubeconfig = Some("/tmp/kubeconfig".into());

        let env = TestEnv::from_console_addr(Platform::Openshift, &cfg, "http://console.example.com");
        assert_eq!(env.namespace(), "e2e");
        assert_eq!(env.addrs().grafana, "http://console.example.com/service/grafana");

        let kubectl = env.kubectl();
        assert_eq!(kubectl.command_line().to_string(), "kubectl -n e2e");
        assert_eq!(
            kubectl.options().env.get("KUBECONFIG").map(String::as_str),
            Some("/tmp/kubeconfig")
        );
    }
}

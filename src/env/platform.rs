// src/env/platform.rs

//! Talking to `minikube` and `oc` to find out where the stack under test
//! lives and how to reach it.

use tracing::{debug, info};

use crate::env::route::RouteList;
use crate::errors::{HarnessError, Result};
use crate::process::{CaptureBuffer, Cmd, CmdOptions, ProcessError};
use crate::types::Platform;

/// Probe `minikube status`, then `oc status`.
///
/// A tool that is missing or exits non-zero simply counts as "not this
/// platform".
pub async fn detect_platform(options: &CmdOptions) -> Result<Platform> {
    if succeeds(Cmd::new("minikube").arg("status").with_options(options.clone())).await {
        return Ok(Platform::Minikube);
    }
    if succeeds(Cmd::new("oc").arg("status").with_options(options.clone())).await {
        return Ok(Platform::Openshift);
    }

    Err(HarnessError::Platform(
        "could not determine platform: neither `minikube status` nor `oc status` succeeded"
            .to_string(),
    ))
}

async fn succeeds(cmd: Cmd) -> bool {
    let command = cmd.command_line().clone();
    match cmd.run().await {
        Ok(()) => {
            debug!(%command, "platform probe succeeded");
            true
        }
        Err(err) => {
            debug!(%command, error = %err, "platform probe failed");
            false
        }
    }
}

/// Output of `minikube ip`, trimmed.
pub async fn minikube_ip(options: &CmdOptions) -> Result<String> {
    let out = Cmd::new("minikube")
        .arg("ip")
        .with_options(options.clone())
        .output()
        .await?;

    let ip = out.trim();
    if ip.is_empty() {
        return Err(HarnessError::Platform("`minikube ip` printed nothing".to_string()));
    }
    Ok(ip.to_string())
}

/// `oc expose service <service>`. An existing route is fine.
pub async fn openshift_expose(service: &str, options: &CmdOptions) -> Result<()> {
    let stderr = CaptureBuffer::new();
    let result = Cmd::new("oc")
        .args(["expose", "service", service])
        .with_options(options.clone())
        .capture_stderr(&stderr)
        .run()
        .await;

    match result {
        Ok(()) => {
            info!(service, "exposed service through a route");
            Ok(())
        }
        Err(ProcessError::ExitedNonZero { .. }) if stderr.contents().contains("already exists") => {
            debug!(service, "route already exists");
            Ok(())
        }
        Err(err) => Err(err.into()),
    }
}

/// Public host of the route for `service`, from `oc get route -o json`.
pub async fn openshift_route_host(service: &str, options: &CmdOptions) -> Result<String> {
    let json = Cmd::new("oc")
        .args(["get", "route", "-o", "json"])
        .with_options(options.clone())
        .output()
        .await?;

    let routes = RouteList::from_json(&json)?;
    routes
        .host_for(service)
        .map(str::to_string)
        .ok_or_else(|| HarnessError::Platform(format!("no route found for service {service:?}")))
}

/// `oc delete route <service>`.
pub async fn openshift_unexpose(service: &str, options: &CmdOptions) -> Result<()> {
    Cmd::new("oc")
        .args(["delete", "route", service])
        .with_options(options.clone())
        .run()
        .await?;
    info!(service, "deleted route");
    Ok(())
}

// src/env/route.rs

//! Typed view of `oc get route -o json`.
//!
//! Only the fields needed to find a route's public host are modelled; the
//! rest of the object is ignored.

use serde::Deserialize;

use crate::errors::{HarnessError, Result};

#[derive(Debug, Clone, Deserialize)]
pub struct RouteList {
    #[serde(default)]
    pub items: Vec<Route>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Route {
    pub metadata: RouteMetadata,
    pub spec: RouteSpec,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteMetadata {
    pub name: String,
    #[serde(default)]
    pub namespace: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RouteSpec {
    pub host: String,
    #[serde(default)]
    pub to: Option<RouteTarget>,
}

/// Backend the route points at.
#[derive(Debug, Clone, Deserialize)]
pub struct RouteTarget {
    pub kind: String,
    pub name: String,
}

impl RouteList {
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|source| HarnessError::Decode {
            what: "route list",
            source,
        })
    }

    /// Host of the route named after `service`, falling back to any route
    /// whose target is that service.
    pub fn host_for(&self, service: &str) -> Option<&str> {
        self.items
            .iter()
            .find(|r| r.metadata.name == service)
            .or_else(|| {
                self.items.iter().find(|r| {
                    r.spec
                        .to
                        .as_ref()
                        .is_some_and(|t| t.kind == "Service" && t.name == service)
                })
            })
            .map(|r| r.spec.host.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ROUTES: &str = r#"{
        "apiVersion": "v1",
        "kind": "List",
        "items": [
            {
                "kind": "Route",
                "metadata": { "name": "grafana", "namespace": "lightbend-test" },
                "spec": { "host": "grafana.apps.example.com", "to": { "kind": "Service", "name": "grafana" } }
            },
            {
                "kind": "Route",
                "metadata": { "name": "console", "namespace": "lightbend-test" },
                "spec": {
                    "host": "console.apps.example.com",
                    "port": { "targetPort": "http" },
                    "to": { "kind": "Service", "name": "console-server", "weight": 100 }
                }
            }
        ],
        "metadata": { "resourceVersion": "" }
    }"#;

    #[test]
    fn finds_route_by_name() {
        let routes = RouteList::from_json(ROUTES).unwrap();
        assert_eq!(routes.host_for("grafana"), Some("grafana.apps.example.com"));
        assert_eq!(routes.items[0].metadata.namespace.as_deref(), Some("lightbend-test"));
    }

    #[test]
    fn falls_back_to_route_target() {
        let routes = RouteList::from_json(ROUTES).unwrap();
        assert_eq!(routes.host_for("console-server"), Some("console.apps.example.com"));
        assert_eq!(routes.host_for("missing"), None);
    }

    #[test]
    fn empty_list_has_no_hosts() {
        let routes = RouteList::from_json(r#"{"kind": "List", "items": []}"#).unwrap();
        assert!(routes.host_for("console-server").is_none());
    }

    #[test]
    fn route_without_host_is_a_decode_error() {
        let err = RouteList::from_json(r#"{"items": [{"metadata": {"name": "x"}, "spec": {}}]}"#)
            .unwrap_err();
        assert!(matches!(err, HarnessError::Decode { what: "route list", .. }));
    }
}
